//! End-to-end editing flows through `EditorSession`
//!
//! Run with: cargo test -p pdfedit-session --test session_flow

mod common;

use common::{labeled_pdf, labels, page_labels};
use pdfedit_session::{
    Activity, BorderConfig, EditorConfig, EditorError, EditorSession, ErrorKind, Metadata,
    Outcome, PageFilter, TextConfig,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn session_with(pages: u32, prefix: &str) -> EditorSession {
    let session = EditorSession::new(&EditorConfig::default());
    let outcome = session
        .load(format!("{}.pdf", prefix), labeled_pdf(pages, prefix))
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Applied(_)));
    session
}

fn current_labels(session: &EditorSession) -> Vec<String> {
    page_labels(session.current().unwrap().bytes())
}

fn assert_thumbnails_match(session: &EditorSession) {
    let state = session.state();
    let document = state.document.as_ref().unwrap();
    assert_eq!(state.thumbnails.len(), document.page_count());
    assert_eq!(page_labels(document.bytes()).len(), document.page_count());
    for (i, thumb) in state.thumbnails.iter().enumerate() {
        assert_eq!(thumb.index, i);
    }
}

#[tokio::test]
async fn test_load_projects_one_thumbnail_per_page() {
    let session = session_with(4, "Load").await;

    let state = session.state();
    assert_eq!(state.page_count(), 4);
    assert_eq!(state.thumbnails.len(), 4);
    assert_eq!(state.activity, Activity::Idle);
    assert!(state.thumbnails[0].image.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_thumbnails_track_every_mutation() {
    let session = session_with(3, "Track").await;

    session.delete_page(0).await.unwrap();
    assert_thumbnails_match(&session);

    session.reorder_page(0, 1).await.unwrap();
    assert_thumbnails_match(&session);

    session.merge(labeled_pdf(2, "More")).await.unwrap();
    assert_thumbnails_match(&session);

    session
        .set_metadata(Metadata {
            title: Some("Tracked".into()),
            ..Metadata::default()
        })
        .await
        .unwrap();
    assert_thumbnails_match(&session);

    session.select_page(Some(3)).await.unwrap();
    session
        .apply_filters(
            PageFilter {
                grayscale: 1.0,
                ..PageFilter::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_thumbnails_match(&session);

    session
        .add_text(TextConfig::new("Approved", 72.0, 72.0))
        .await
        .unwrap();
    assert_thumbnails_match(&session);

    assert_eq!(session.state().page_count(), 4);
}

#[tokio::test]
async fn test_delete_middle_page_of_three() {
    let session = session_with(3, "Del").await;
    let before = session.state().thumbnails;

    session.delete_page(1).await.unwrap();

    let state = session.state();
    assert_eq!(state.page_count(), 2);
    assert_eq!(state.thumbnails.len(), 2);
    assert_eq!(state.thumbnails[1].fingerprint, before[2].fingerprint);
    assert_eq!(state.thumbnails[0].fingerprint, before[0].fingerprint);
    assert_eq!(current_labels(&session), vec!["Del-Page-1", "Del-Page-3"]);
}

#[tokio::test]
async fn test_delete_out_of_range_is_an_error() {
    let session = session_with(2, "Oob").await;
    let id = session.current().unwrap().id();

    let err = session.delete_page(2).await.unwrap_err();
    assert_eq!(
        err,
        EditorError::IndexOutOfRange {
            index: 2,
            page_count: 2
        }
    );
    assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);

    let state = session.state();
    assert_eq!(state.document.unwrap().id(), id);
    assert_eq!(
        state.last_failure.map(|f| f.kind),
        Some(ErrorKind::IndexOutOfRange)
    );
}

#[tokio::test]
async fn test_set_title_keeps_other_fields() {
    let session = session_with(1, "Meta").await;
    session
        .set_metadata(Metadata {
            author: Some("Grace".into()),
            keywords: Some("draft".into()),
            ..Metadata::default()
        })
        .await
        .unwrap();
    assert_eq!(session.get_metadata().await.unwrap().title, None);

    session
        .set_metadata(Metadata {
            title: Some("X".into()),
            ..Metadata::default()
        })
        .await
        .unwrap();

    assert_eq!(
        session.get_metadata().await.unwrap(),
        Metadata {
            title: Some("X".into()),
            author: Some("Grace".into()),
            keywords: Some("draft".into()),
            ..Metadata::default()
        }
    );
}

#[tokio::test]
async fn test_reorder_outside_document_is_a_no_op() {
    let session = session_with(3, "Noop").await;
    let before = session.current().unwrap();
    let thumbnails = session.state().thumbnails;

    assert_eq!(session.reorder_page(0, 3).await, Ok(Outcome::Unchanged));
    assert_eq!(session.reorder_page(2, 99).await, Ok(Outcome::Unchanged));

    let after = session.current().unwrap();
    assert_eq!(after.id(), before.id());
    assert!(Arc::ptr_eq(after.bytes(), before.bytes()));
    assert_eq!(session.state().thumbnails, thumbnails);
    assert!(session.state().last_failure.is_none());
}

#[tokio::test]
async fn test_reorder_to_same_index_keeps_page_order() {
    let session = session_with(3, "Same").await;

    assert_eq!(session.reorder_page(1, 1).await, Ok(Outcome::Unchanged));
    assert_eq!(current_labels(&session), labels("Same", 3));
}

#[tokio::test]
async fn test_reorder_shifts_pages_contiguously() {
    let session = session_with(4, "Mv").await;

    session.reorder_page(3, 1).await.unwrap();

    assert_eq!(
        current_labels(&session),
        vec!["Mv-Page-1", "Mv-Page-4", "Mv-Page-2", "Mv-Page-3"]
    );
}

#[tokio::test]
async fn test_reorder_from_out_of_range_is_an_error() {
    let session = session_with(2, "From").await;
    assert!(matches!(
        session.reorder_page(5, 0).await,
        Err(EditorError::IndexOutOfRange { index: 5, .. })
    ));

    let state = session.state();
    assert!(!state.is_busy());
    assert_eq!(
        state.last_failure.map(|f| f.kind),
        Some(ErrorKind::IndexOutOfRange)
    );
}

#[tokio::test]
async fn test_merge_appends_second_document() {
    let session = session_with(2, "A").await;

    session.merge(labeled_pdf(3, "B")).await.unwrap();

    let mut expected = labels("A", 2);
    expected.extend(labels("B", 3));
    assert_eq!(current_labels(&session), expected);
    assert_eq!(session.state().thumbnails.len(), 5);
    assert_eq!(session.current().unwrap().name(), "A.pdf");
}

#[tokio::test]
async fn test_merge_with_invalid_file_keeps_document() {
    let session = session_with(2, "Keep").await;
    let before = session.current().unwrap();

    let err = session.merge(b"not a pdf at all".to_vec()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);

    assert_eq!(session.current().unwrap(), before);
    assert!(!session.state().is_busy());
}

#[tokio::test]
async fn test_filters_and_text_need_a_selection() {
    let session = session_with(2, "Sel").await;
    let id = session.current().unwrap().id();

    let filter = PageFilter {
        sepia: 0.5,
        ..PageFilter::default()
    };
    assert_eq!(
        session.apply_filters(filter.clone(), None).await,
        Ok(Outcome::Unchanged)
    );
    assert_eq!(
        session.add_text(TextConfig::new("Hi", 10.0, 10.0)).await,
        Ok(Outcome::Unchanged)
    );
    assert_eq!(session.current().unwrap().id(), id);

    session.select_page(Some(1)).await.unwrap();
    assert!(matches!(
        session.apply_filters(filter, None).await,
        Ok(Outcome::Applied(_))
    ));
}

#[tokio::test]
async fn test_empty_filter_without_border_changes_nothing() {
    let session = session_with(1, "Empty").await;
    session.select_page(Some(0)).await.unwrap();

    let invisible = BorderConfig {
        width: 0.0,
        ..BorderConfig::default()
    };
    assert_eq!(
        session
            .apply_filters(PageFilter::default(), Some(invisible))
            .await,
        Ok(Outcome::Unchanged)
    );

    assert!(matches!(
        session
            .apply_filters(PageFilter::default(), Some(BorderConfig::default()))
            .await,
        Ok(Outcome::Applied(_))
    ));
}

#[tokio::test]
async fn test_malformed_border_is_an_error_not_a_no_op() {
    let session = session_with(1, "NanBorder").await;
    session.select_page(Some(0)).await.unwrap();
    let before = session.current().unwrap();

    let border = BorderConfig {
        width: f32::NAN,
        ..BorderConfig::default()
    };
    let err = session
        .apply_filters(PageFilter::default(), Some(border))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EngineFailure);
    assert!(err.to_string().contains("border width"));
    let state = session.state();
    assert_eq!(state.document.unwrap(), before);
    assert_eq!(
        state.last_failure.map(|f| f.kind),
        Some(ErrorKind::EngineFailure)
    );
}

#[tokio::test]
async fn test_invalid_text_surfaces_engine_failure() {
    let session = session_with(1, "Bad").await;
    session.select_page(Some(0)).await.unwrap();
    let before = session.current().unwrap();

    let mut config = TextConfig::new("x", 0.0, 0.0);
    config.opacity = 3.0;
    let err = session.add_text(config).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EngineFailure);
    assert_eq!(session.current().unwrap(), before);
}

#[tokio::test]
async fn test_selection_is_validated_and_cleared() {
    let session = session_with(3, "Pick").await;

    assert!(matches!(
        session.select_page(Some(3)).await,
        Err(EditorError::IndexOutOfRange { .. })
    ));

    session.select_page(Some(2)).await.unwrap();
    assert_eq!(session.state().selection, Some(2));

    session.delete_page(0).await.unwrap();
    assert_eq!(session.state().selection, None);
}

#[tokio::test]
async fn test_export_uses_original_name() {
    let session = session_with(2, "report").await;
    session.delete_page(0).await.unwrap();

    let export = session.export().unwrap();
    assert_eq!(export.file_name, "edited_report.pdf");
    assert_eq!(page_labels(&export.bytes), vec!["report-Page-2"]);
    assert!(!session.state().is_busy());
}

#[tokio::test]
async fn test_load_replaces_document_and_resets_selection() {
    let session = session_with(3, "First").await;
    session.select_page(Some(2)).await.unwrap();
    let first_id = session.current().unwrap().id();

    session.load("second.pdf", labeled_pdf(1, "Second")).await.unwrap();

    let state = session.state();
    let document = state.document.unwrap();
    assert!(document.id() > first_id);
    assert_eq!(document.name(), "second.pdf");
    assert_eq!(state.selection, None);
    assert_eq!(state.thumbnails.len(), 1);
}
