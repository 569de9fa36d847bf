use crate::integration::support::{
    algorithms_catalog, course, module, section, FakeCatalog, Mirror,
};
use coursemirror::identity::{key_for_file, key_for_module};
use coursemirror::progress::NoopReporter;
use coursemirror::state::StateRecord;
use coursemirror::sync::{DownloadLayout, SyncEngine};
use std::fs;

#[tokio::test]
async fn test_first_run_downloads_everything_and_reports_modules() {
    let mirror = Mirror::new();
    let catalog = algorithms_catalog();

    let report = mirror.sync(&catalog).await;

    assert!(report.first_run);
    assert_eq!(report.downloaded.len(), 2);
    assert_eq!(report.fresh_downloads(), 2);
    assert!(report.redownloaded.is_empty());
    assert_eq!(report.new_items.len(), 1);
    assert_eq!(report.new_items[0].name, "Week1");
    assert_eq!(report.new_items[0].kind, "resource");

    let slides = mirror.path("Algorithms101", "Week 1", "slides.pdf");
    assert_eq!(
        fs::read_to_string(&slides).unwrap(),
        "contents of mem://100/slides.pdf"
    );
    assert!(mirror.path("Algorithms101", "Week 1", "notes.pdf").is_file());

    let state = mirror.saved_state();
    assert_eq!(state.len(), 3);
    assert!(matches!(
        state.get(&key_for_module(10, 100)),
        Some(StateRecord::ModuleSeen { .. })
    ));
    match state.get(&key_for_file(10, 100, "slides.pdf")) {
        Some(StateRecord::DownloadedFile(record)) => {
            assert_eq!(record.path, slides);
            assert_eq!(record.course, "Algorithms101");
            assert_eq!(record.module, "Week1");
        }
        other => panic!("unexpected record {:?}", other),
    }
}

#[tokio::test]
async fn test_deleted_file_is_redownloaded_without_new_items() {
    let mirror = Mirror::new();
    let catalog = algorithms_catalog();
    mirror.sync(&catalog).await;
    catalog.take_fetches();

    fs::remove_file(mirror.path("Algorithms101", "Week 1", "slides.pdf")).unwrap();
    let (report, lines) = mirror.sync_with_lines(&catalog).await;

    assert!(!report.first_run);
    assert_eq!(report.redownloaded, vec!["slides.pdf".to_string()]);
    assert_eq!(report.downloaded.len(), 1);
    assert!(report.new_items.is_empty());
    assert_eq!(report.cleaned_from_state, 1);
    assert_eq!(catalog.take_fetches(), vec!["slides.pdf".to_string()]);
    assert!(mirror.path("Algorithms101", "Week 1", "slides.pdf").is_file());
    assert!(lines
        .iter()
        .any(|l| l.contains("Re-downloading deleted file:") && l.ends_with("slides.pdf")));

    match mirror
        .saved_state()
        .get(&key_for_file(10, 100, "slides.pdf"))
    {
        Some(StateRecord::DownloadedFile(_)) => {}
        other => panic!("slides.pdf not tracked after re-download: {:?}", other),
    }
}

#[tokio::test]
async fn test_unchanged_catalog_is_idempotent() {
    let mirror = Mirror::new();
    let catalog = algorithms_catalog();
    mirror.sync(&catalog).await;
    let state_after_first = mirror.saved_state();
    catalog.take_fetches();

    let report = mirror.sync(&catalog).await;

    assert!(!report.first_run);
    assert!(report.downloaded.is_empty());
    assert!(report.new_items.is_empty());
    assert!(catalog.take_fetches().is_empty());

    assert_eq!(mirror.saved_state(), state_after_first);
}

#[tokio::test]
async fn test_new_module_is_reported_once() {
    let mirror = Mirror::new();
    mirror.sync(&algorithms_catalog()).await;

    let grown = FakeCatalog::default().with_course(
        course(10, "Algorithms101"),
        vec![
            section(
                "Week 1",
                1,
                vec![module(
                    100,
                    "Week1",
                    "resource",
                    &["slides.pdf", "notes.pdf"],
                )],
            ),
            section(
                "Week 2",
                2,
                vec![
                    module(200, "Sorting", "resource", &["sorting.pdf"]),
                    module(201, "Discussion", "forum", &[]),
                ],
            ),
        ],
    );

    let report = mirror.sync(&grown).await;
    let names: Vec<_> = report.new_items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Sorting", "Discussion"]);
    assert_eq!(report.new_items[0].section, "Week 2");
    assert_eq!(report.new_items[1].kind, "forum");
    assert_eq!(report.fresh_downloads(), 1);

    let again = mirror.sync(&grown).await;
    assert!(again.new_items.is_empty());
    assert!(again.downloaded.is_empty());
}

#[tokio::test]
async fn test_failed_fetch_is_retried_next_run() {
    let mirror = Mirror::new();
    let catalog = algorithms_catalog();
    catalog.fail_file("notes.pdf");

    let report = mirror.sync(&catalog).await;
    assert_eq!(report.downloaded.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].file_name, "notes.pdf");
    assert!(report.has_failures());
    assert!(!mirror.path("Algorithms101", "Week 1", "notes.pdf").exists());
    assert!(!mirror
        .saved_state()
        .contains(&key_for_file(10, 100, "notes.pdf")));

    catalog.heal_file("notes.pdf");
    catalog.take_fetches();
    let retry = mirror.sync(&catalog).await;

    assert_eq!(catalog.take_fetches(), vec!["notes.pdf".to_string()]);
    assert_eq!(retry.fresh_downloads(), 1);
    assert!(retry.redownloaded.is_empty());
    assert!(retry.failures.is_empty());
    assert!(mirror
        .saved_state()
        .contains(&key_for_file(10, 100, "notes.pdf")));
}

#[tokio::test]
async fn test_course_listing_failure_skips_only_that_course() {
    let mirror = Mirror::new();
    let catalog = algorithms_catalog()
        .with_course(
            course(20, "Compilers"),
            vec![section(
                "Intro",
                0,
                vec![module(300, "Syllabus", "resource", &["syllabus.pdf"])],
            )],
        )
        .with_failing_course(20);

    let report = mirror.sync(&catalog).await;

    assert_eq!(report.skipped_courses.len(), 1);
    assert_eq!(report.skipped_courses[0].course, "Compilers");
    assert_eq!(report.downloaded.len(), 2);
    assert!(report.has_failures());
    assert!(!mirror.path("Compilers", "Intro", "syllabus.pdf").exists());
    assert!(!mirror.saved_state().contains(&key_for_module(20, 300)));
}

#[tokio::test]
async fn test_failed_course_listing_leaves_state_untouched() {
    let mirror = Mirror::new();
    mirror.sync(&algorithms_catalog()).await;
    let before = fs::read(mirror.store.path()).unwrap();

    fs::remove_file(mirror.path("Algorithms101", "Week 1", "slides.pdf")).unwrap();
    let broken = algorithms_catalog().with_failing_listing();
    let result = SyncEngine::new(&broken, &mirror.store, DownloadLayout::new(mirror.root()))
        .run(&mut NoopReporter)
        .await;

    assert!(result.is_err());
    assert_eq!(fs::read(mirror.store.path()).unwrap(), before);
}

#[tokio::test]
async fn test_first_run_without_state_does_not_write_state_on_failure() {
    let mirror = Mirror::new();
    let broken = FakeCatalog::default().with_failing_listing();

    let result = SyncEngine::new(&broken, &mirror.store, DownloadLayout::new(mirror.root()))
        .run(&mut NoopReporter)
        .await;

    assert!(result.is_err());
    assert!(!mirror.store.path().exists());
}

#[tokio::test]
async fn test_file_listed_twice_is_fetched_once() {
    let mirror = Mirror::new();
    let catalog = FakeCatalog::default().with_course(
        course(10, "Algorithms101"),
        vec![section(
            "Week 1",
            1,
            vec![module(
                100,
                "Week1",
                "folder",
                &["slides.pdf", "slides.pdf"],
            )],
        )],
    );

    let report = mirror.sync(&catalog).await;

    assert_eq!(catalog.take_fetches(), vec!["slides.pdf".to_string()]);
    assert_eq!(report.downloaded.len(), 1);
    assert_eq!(report.new_items.len(), 1);
}

#[tokio::test]
async fn test_file_on_disk_but_untracked_is_fetched() {
    let mirror = Mirror::new();
    let catalog = algorithms_catalog();
    mirror.sync(&catalog).await;

    // Forget notes.pdf but leave it on disk.
    let mut state = mirror.saved_state();
    state.remove(&key_for_file(10, 100, "notes.pdf"));
    mirror.store.save(&state).unwrap();
    catalog.take_fetches();

    let report = mirror.sync(&catalog).await;

    assert_eq!(catalog.take_fetches(), vec!["notes.pdf".to_string()]);
    assert_eq!(report.fresh_downloads(), 1);
    assert!(report.redownloaded.is_empty());
}

#[tokio::test]
async fn test_corrupt_state_is_treated_as_first_run() {
    let mirror = Mirror::new();
    let catalog = algorithms_catalog();
    mirror.sync(&catalog).await;
    fs::write(mirror.store.path(), "{ truncated").unwrap();

    let report = mirror.sync(&catalog).await;

    assert!(report.first_run);
    assert_eq!(report.new_items.len(), 1);
    assert_eq!(report.downloaded.len(), 2);
    assert_eq!(mirror.saved_state().len(), 3);

    let mut corrupt = mirror.store.path().as_os_str().to_os_string();
    corrupt.push(".corrupt");
    assert!(std::path::Path::new(&corrupt).exists());
}

#[tokio::test]
async fn test_deleted_course_directory_triggers_redownload_of_all_files() {
    let mirror = Mirror::new();
    let catalog = algorithms_catalog();
    mirror.sync(&catalog).await;

    fs::remove_dir_all(mirror.root().join("Algorithms101")).unwrap();
    let report = mirror.sync(&catalog).await;

    let mut redownloaded = report.redownloaded.clone();
    redownloaded.sort();
    assert_eq!(redownloaded, vec!["notes.pdf", "slides.pdf"]);
    assert!(report.new_items.is_empty());
    assert_eq!(report.cleaned_from_state, 2);
}
