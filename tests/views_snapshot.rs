use insta::assert_debug_snapshot;
use yatube::application::pagination::PageWindow;
use yatube::presentation::views::PaginatorView;

#[test]
fn snapshot_middle_page_paginator() {
    let page = PageWindow::resolve(Some("2"), 25, 10).into_page(vec![(); 10]);

    assert_debug_snapshot!(PaginatorView::from(&page), @r###"
    PaginatorView {
        number: 2,
        num_pages: 3,
        has_other_pages: true,
        previous: Some(
            1,
        ),
        next: Some(
            3,
        ),
        pages: [
            PageLink {
                number: 1,
                current: false,
            },
            PageLink {
                number: 2,
                current: true,
            },
            PageLink {
                number: 3,
                current: false,
            },
        ],
    }
    "###);
}

#[test]
fn snapshot_single_page_paginator() {
    let page = PageWindow::resolve(None, 3, 10).into_page(vec![(); 3]);

    assert_debug_snapshot!(PaginatorView::from(&page), @r###"
    PaginatorView {
        number: 1,
        num_pages: 1,
        has_other_pages: false,
        previous: None,
        next: None,
        pages: [
            PageLink {
                number: 1,
                current: true,
            },
        ],
    }
    "###);
}
