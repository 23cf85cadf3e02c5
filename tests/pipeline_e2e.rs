//! End-to-end runs of the pipeline against a mock portal: fresh mirror,
//! resume after a local deletion, and an unchanged rerun.

mod support;

use coursevault_core::index::{Index, IndexOrigin};
use coursevault_core::ledger::ledger_key;
use coursevault_core::{
    DownloadLedger, IndexStore, NoProgress, PortalConfig, StaticDecisions, open_session, run,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::portal::{
    config_json, course_list_html, file_page_html, modules_html, mount_file, mount_html,
    write_cookies,
};
use support::socket_guard::start_mock_server_or_skip;

const NOTES: &[u8] = b"algebra notes";
const CELLS: &[u8] = b"cell biology slides";

async fn mount_portal(server: &MockServer, cells_gets: u64) {
    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                course_list_html(&[("1", "Algebra"), ("2", "Biology")]),
                "text/html",
            ),
        )
        .expect(1)
        .named("course list")
        .mount(server)
        .await;
    mount_html(
        server,
        "/courses/1/modules",
        modules_html(&[("Week 1", vec![("Notes", "/courses/1/modules/items/11")])]),
    )
    .await;
    mount_html(
        server,
        "/courses/2/modules",
        modules_html(&[("Cells", vec![("Slides", "/courses/2/modules/items/21")])]),
    )
    .await;
    mount_html(
        server,
        "/courses/1/modules/items/11",
        file_page_html("/courses/1/files/101/download?download_frd=1", "notes.pdf"),
    )
    .await;
    mount_html(
        server,
        "/courses/2/modules/items/21",
        file_page_html("/courses/2/files/201/download?download_frd=1", "cells.pdf"),
    )
    .await;
    mount_file(server, "/courses/1/files/101/download", NOTES, 1).await;
    mount_file(server, "/courses/2/files/201/download", CELLS, cells_gets).await;
}

fn load_config(root: &std::path::Path, base_url: &str) -> PortalConfig {
    let config_path = root.join("config.json");
    std::fs::write(&config_path, config_json(base_url, root)).unwrap();
    write_cookies(root);
    PortalConfig::load(&config_path).unwrap()
}

fn saved_index(config: &PortalConfig) -> Index {
    IndexStore::new(&config.index_file).load().unwrap()
}

#[tokio::test]
async fn test_mirror_resume_and_rerun() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_portal(&server, 2).await;

    let dir = TempDir::new().expect("temp dir");
    let config = load_config(dir.path(), &server.uri());
    let client = open_session(&config.cookies_file, &config.base_url, config.timeouts()).unwrap();
    let notes = config.download_dir.join("Algebra").join("Week 1").join("notes.pdf");
    let cells = config.download_dir.join("Biology").join("Cells").join("cells.pdf");

    // First run: nothing saved, crawl and fetch both files.
    let mut decisions = config.static_decisions();
    let first = run(&config, &client, &NoProgress, &mut decisions).await.unwrap();
    assert_eq!(first.origin, IndexOrigin::Crawled);
    assert_eq!(first.pending_files, 2);
    assert_eq!(first.pending_bytes, (NOTES.len() + CELLS.len()) as u64);
    assert_eq!(first.stats.downloaded, 2);
    assert_eq!(first.stats.bytes, (NOTES.len() + CELLS.len()) as u64);
    assert_eq!(first.summary.courses, 2);
    assert_eq!(first.summary.files, 2);
    assert_eq!(first.summary.downloaded, 2);
    assert_eq!(std::fs::read(&notes).unwrap(), NOTES);
    assert_eq!(std::fs::read(&cells).unwrap(), CELLS);

    let ledger = DownloadLedger::load(&config.ledger_file);
    assert!(ledger.contains(&notes));
    assert!(ledger.contains(&cells));
    let index = saved_index(&config);
    assert_eq!(index.total_files, 2);
    assert!(index.files().all(|file| file.downloaded));

    // Second run: one file was deleted locally; only it is fetched again.
    std::fs::remove_file(&cells).unwrap();
    let second = run(&config, &client, &NoProgress, &mut decisions).await.unwrap();
    assert_eq!(second.origin, IndexOrigin::Reconciled);
    assert_eq!(second.pending_files, 1);
    assert_eq!(second.pending_bytes, CELLS.len() as u64);
    assert_eq!(second.stats.downloaded, 1);
    assert_eq!(second.stats.failed, 0);
    assert_eq!(second.summary.downloaded, 2);
    assert_eq!(std::fs::read(&cells).unwrap(), CELLS);

    // Third run: everything is on disk, nothing is fetched.
    let third = run(&config, &client, &NoProgress, &mut decisions).await.unwrap();
    assert_eq!(third.origin, IndexOrigin::Reconciled);
    assert_eq!(third.pending_files, 0);
    assert_eq!(third.stats.total(), 0);
    assert_eq!(third.stats.bytes, 0);

    let index = saved_index(&config);
    assert_eq!(index.total_courses, 2);
    assert_eq!(index.total_size, (NOTES.len() + CELLS.len()) as u64);
    assert_eq!(index.download_log.len(), 2);
    server.verify().await;
}

#[tokio::test]
async fn test_declined_download_fetches_nothing() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(&server, "/courses", course_list_html(&[("1", "Algebra")])).await;
    mount_html(
        &server,
        "/courses/1/modules",
        modules_html(&[("Week 1", vec![("Notes", "/courses/1/modules/items/11")])]),
    )
    .await;
    mount_html(
        &server,
        "/courses/1/modules/items/11",
        file_page_html("/courses/1/files/101/download?download_frd=1", "notes.pdf"),
    )
    .await;
    mount_file(&server, "/courses/1/files/101/download", NOTES, 0).await;

    struct Decline;
    impl coursevault_core::Decisions for Decline {
        fn reindex(&mut self, _existing: &coursevault_core::index::IndexSummary) -> bool {
            false
        }
        fn redownload(&mut self, _reindexing: bool) -> bool {
            false
        }
        fn proceed(&mut self, _files: usize, _bytes: u64) -> bool {
            false
        }
    }

    let dir = TempDir::new().expect("temp dir");
    let config = load_config(dir.path(), &server.uri());
    let client = open_session(&config.cookies_file, &config.base_url, config.timeouts()).unwrap();

    let report = run(&config, &client, &NoProgress, &mut Decline).await.unwrap();
    assert!(report.declined);
    assert_eq!(report.pending_files, 1);
    assert_eq!(report.stats.total(), 0);
    // The crawl is still saved for the next run.
    assert_eq!(saved_index(&config).total_files, 1);
    server.verify().await;
}

#[tokio::test]
async fn test_forced_reindex_and_redownload_refetch_everything() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(&server, "/courses", course_list_html(&[("1", "Algebra")])).await;
    mount_html(
        &server,
        "/courses/1/modules",
        modules_html(&[("Week 1", vec![("Notes", "/courses/1/modules/items/11")])]),
    )
    .await;
    mount_html(
        &server,
        "/courses/1/modules/items/11",
        file_page_html("/courses/1/files/101/download?download_frd=1", "notes.pdf"),
    )
    .await;
    mount_file(&server, "/courses/1/files/101/download", NOTES, 2).await;

    let dir = TempDir::new().expect("temp dir");
    let config = load_config(dir.path(), &server.uri());
    let client = open_session(&config.cookies_file, &config.base_url, config.timeouts()).unwrap();

    let mut decisions = config.static_decisions();
    let first = run(&config, &client, &NoProgress, &mut decisions).await.unwrap();
    assert_eq!(first.stats.downloaded, 1);

    // Reloaded index, redownload forced: the file is replaced.
    let mut forced = StaticDecisions {
        always_reindex: false,
        always_redownload: true,
    };
    let second = run(&config, &client, &NoProgress, &mut forced).await.unwrap();
    assert_eq!(second.origin, IndexOrigin::Reconciled);
    assert_eq!(second.pending_files, 1);
    assert_eq!(second.stats.downloaded, 1);
    server.verify().await;
}

#[tokio::test]
async fn test_rejected_file_stays_pending_and_unrecorded() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(&server, "/courses", course_list_html(&[("1", "Algebra")])).await;
    mount_html(
        &server,
        "/courses/1/modules",
        modules_html(&[(
            "Week 1",
            vec![
                ("Notes", "/courses/1/modules/items/11"),
                ("Locked", "/courses/1/modules/items/12"),
            ],
        )]),
    )
    .await;
    mount_html(
        &server,
        "/courses/1/modules/items/11",
        file_page_html("/courses/1/files/101/download?download_frd=1", "notes.pdf"),
    )
    .await;
    mount_html(
        &server,
        "/courses/1/modules/items/12",
        file_page_html("/courses/1/files/102/download?download_frd=1", "locked.pdf"),
    )
    .await;
    mount_file(&server, "/courses/1/files/101/download", NOTES, 1).await;
    Mock::given(method("HEAD"))
        .and(path("/courses/1/files/102/download"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/courses/1/files/102/download"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let config = load_config(dir.path(), &server.uri());
    let client = open_session(&config.cookies_file, &config.base_url, config.timeouts()).unwrap();
    let locked = config.download_dir.join("Algebra").join("Week 1").join("locked.pdf");

    let mut decisions = config.static_decisions();
    let report = run(&config, &client, &NoProgress, &mut decisions).await.unwrap();
    assert_eq!(report.stats.downloaded, 1);
    assert_eq!(report.stats.soft_skipped, 1);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.summary.downloaded, 1);
    assert!(!locked.exists());

    let index = saved_index(&config);
    let entry = index.files().find(|file| file.name == "locked.pdf").unwrap();
    assert!(!entry.downloaded);
    assert_eq!(index.download_log.len(), 1);
    assert!(!index.download_log.contains_key(&ledger_key(&locked)));
    assert!(!DownloadLedger::load(&config.ledger_file).contains(&locked));
    server.verify().await;
}
