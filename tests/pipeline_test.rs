use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use git2::{ObjectType, Oid, Repository, Signature, Time};
use relstats::cache::{CacheBackend, ContributionStore, JsonFileCache};
use relstats::cli::Commands;
use relstats::contribution::ContributionType;
use relstats::git::{GitRepository, VersionControl};
use relstats::pipeline::{Pipeline, PipelineOptions};
use relstats::release::{sequence_windows, ReleaseTag, Window, WindowEnd};
use relstats::report::ReleaseRecord;
use relstats::tickets::{parse_subject, TicketReference};
use relstats::tracker::{TracClient, REQUEST_TIMEOUT};
use relstats::utils::Settings;
use relstats::Cli;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Temporary git repository with controllable authors and timestamps
struct TestRepo {
    _temp_dir: TempDir,
    repo_path: PathBuf,
    repo: Repository,
    head: Option<Oid>,
    clock: i64,
}

impl TestRepo {
    fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let repo_path = temp_dir.path().to_path_buf();
        let repo = Repository::init(&repo_path)?;

        Ok(Self {
            _temp_dir: temp_dir,
            repo_path,
            repo,
            head: None,
            clock: 1_600_000_000,
        })
    }

    fn stage(&self, file: &str, content: &str) -> Result<Oid> {
        let file_path = self.repo_path.join(file);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, format!("{content}\n{}\n", self.clock))?;

        let mut index = self.repo.index()?;
        index.add_path(Path::new(file))?;
        index.write()?;
        Ok(index.write_tree()?)
    }

    fn email(author: &str) -> String {
        format!("{}@example.com", author.to_lowercase().replace(' ', "."))
    }

    fn commit(&mut self, author: &str, file: &str, message: &str) -> Result<Oid> {
        let tree = self.repo.find_tree(self.stage(file, message)?)?;

        self.clock += 60;
        let signature = Signature::new(author, &Self::email(author), &Time::new(self.clock, 0))?;

        let parent = self.head.map(|oid| self.repo.find_commit(oid)).transpose()?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        self.head = Some(oid);
        Ok(oid)
    }

    /// Commits a message that is not necessarily valid UTF-8
    fn commit_raw_message(&mut self, author: &str, file: &str, message: &[u8]) -> Result<Oid> {
        let tree = self.stage(file, &String::from_utf8_lossy(message))?;
        let parent = self.head.ok_or_else(|| anyhow::anyhow!("no parent commit"))?;

        self.clock += 60;
        let ident = format!("{author} <{}> {} +0000", Self::email(author), self.clock);
        let mut raw = format!("tree {tree}\nparent {parent}\nauthor {ident}\ncommitter {ident}\n\n").into_bytes();
        raw.extend_from_slice(message);

        let oid = self.repo.odb()?.write(ObjectType::Commit, &raw)?;
        self.repo.head()?.set_target(oid, "raw commit")?;
        self.head = Some(oid);
        Ok(oid)
    }

    fn tag(&self, name: &str) -> Result<()> {
        let head = self.head.ok_or_else(|| anyhow::anyhow!("no commits to tag"))?;
        let object = self.repo.find_object(head, None)?;
        self.repo.tag_lightweight(name, &object, false)?;
        Ok(())
    }

    fn write_mailmap(&self, content: &str) -> Result<()> {
        fs::write(self.repo_path.join(".mailmap"), content)?;
        Ok(())
    }
}

/// Two releases of history under `core/`, plus noise outside it
fn release_history() -> Result<TestRepo> {
    let mut repo = TestRepo::new()?;

    repo.commit("Alice", "core/models.txt", "Initial import")?;
    repo.tag("0.9")?;
    repo.commit("Alice", "core/models.txt", "Added models")?;
    repo.tag("1.0")?;
    repo.tag("nightly")?;

    repo.commit("Alice", "core/models.txt", "Fixed #101 -- crash on save")?;
    repo.commit("Bob", "core/query.txt", "Fixed #102 -- queryset api")?;
    repo.commit("Bob", "docs/intro.txt", "Fixed #103 -- docs typo")?;
    repo.commit("Alice", "core/models.txt", "Refs #101 -- regression test")?;
    repo.tag("1.1")?;

    repo.commit("Carol", "core/query.txt", "[1.1.x] Fixed #104 -- backported fix")?;
    repo.commit("Alice", "core/query.txt", "Fixed #105 -- faster joins")?;
    repo.commit("Dave", "docs/intro.txt", "Fixed #106 -- docs only")?;

    Ok(repo)
}

fn ticket_response(ticket: u64, category: &str, severity: &str) -> serde_json::Value {
    json!({
        "result": [
            ticket,
            {"__jsonclass__": ["datetime", "2015-01-01T00:00:00"]},
            {"__jsonclass__": ["datetime", "2015-02-01T00:00:00"]},
            {"type": category, "severity": severity, "status": "closed"}
        ],
        "error": null,
        "id": null
    })
}

async fn mount_ticket(server: &MockServer, ticket: u64, category: &str, severity: &str) {
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({"params": [ticket.to_string()]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_response(ticket, category, severity)))
        .mount(server)
        .await;
}

async fn tracker_server() -> MockServer {
    let server = MockServer::start().await;
    mount_ticket(&server, 101, "Bug", "Normal").await;
    mount_ticket(&server, 102, "New feature", "Normal").await;
    mount_ticket(&server, 104, "defect", "Release blocker").await;
    mount_ticket(&server, 105, "Cleanup/optimization", "Normal").await;
    server
}

fn options() -> PipelineOptions {
    PipelineOptions {
        path_filter: "core".to_string(),
        cutoff: 1,
        tip: "HEAD".to_string(),
    }
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

async fn run_report(
    repo: &TestRepo,
    server: &MockServer,
    store: &mut ContributionStore,
) -> Result<Vec<ReleaseRecord>> {
    let vcs = GitRepository::open_at(&repo.repo_path)?;
    let tracker = TracClient::new(&format!("{}/jsonrpc", server.uri()), REQUEST_TIMEOUT)?;
    let options = options();
    Pipeline::new(&vcs, &tracker, &options).run(store).await
}

#[test]
fn git_queries_respect_range_and_path() -> Result<()> {
    let repo = release_history()?;
    let vcs = GitRepository::open_at(&repo.repo_path)?;
    let window = Window {
        start: ReleaseTag::new(1, 0).into(),
        end: WindowEnd::Release(ReleaseTag::new(1, 1).into()),
    };

    let mut tags = vcs.tag_names()?;
    tags.sort();
    assert_eq!(tags, vec!["0.9", "1.0", "1.1", "nightly"]);

    let counts = vcs.author_counts(&window, "core")?;
    assert_eq!(counts.get("Alice"), Some(&2));
    assert_eq!(counts.get("Bob"), Some(&1));
    assert_eq!(counts.len(), 2);

    let subjects = vcs.commit_subjects(&window, "core")?;
    assert_eq!(
        subjects,
        vec![
            "Refs #101 -- regression test",
            "Fixed #102 -- queryset api",
            "Fixed #101 -- crash on save",
        ]
    );

    let everything = vcs.author_counts(&window, "")?;
    assert_eq!(everything.get("Bob"), Some(&2));
    Ok(())
}

#[test]
fn author_counts_apply_mailmap() -> Result<()> {
    let mut repo = release_history()?;
    repo.commit("Bob Smith", "core/query.txt", "Fixed #107 -- old address")?;
    repo.write_mailmap("Bob <bob@example.com> <bob.smith@example.com>\n")?;
    let vcs = GitRepository::open_at(&repo.repo_path)?;
    let window = Window {
        start: ReleaseTag::new(1, 1).into(),
        end: WindowEnd::Tip("HEAD".to_string()),
    };

    let counts = vcs.author_counts(&window, "core")?;
    assert_eq!(counts.get("Bob"), Some(&1));
    assert!(!counts.contains_key("Bob Smith"));
    Ok(())
}

#[test]
fn single_history_pass_matches_separate_queries() -> Result<()> {
    let repo = release_history()?;
    let vcs = GitRepository::open_at(&repo.repo_path)?;
    let window = Window {
        start: ReleaseTag::new(1, 0).into(),
        end: WindowEnd::Release(ReleaseTag::new(1, 1).into()),
    };

    let history = vcs.window_history(&window, "core")?;

    assert_eq!(history.authors, vcs.author_counts(&window, "core")?);
    assert_eq!(history.subjects, vcs.commit_subjects(&window, "core")?);
    Ok(())
}

#[test]
fn latin1_subject_keeps_its_ticket() -> Result<()> {
    let mut repo = release_history()?;
    repo.commit_raw_message("Erin", "core/models.txt", b"Fixed #900 -- caf\xE9")?;
    let vcs = GitRepository::open_at(&repo.repo_path)?;
    let window = Window {
        start: ReleaseTag::new(1, 1).into(),
        end: WindowEnd::Tip("HEAD".to_string()),
    };

    let subjects = vcs.commit_subjects(&window, "core")?;

    assert_eq!(subjects[0], "Fixed #900 -- caf\u{FFFD}");
    assert_eq!(
        parse_subject(&subjects[0]),
        Some(TicketReference::new("900", false))
    );
    assert_eq!(vcs.author_counts(&window, "core")?.get("Erin"), Some(&1));
    Ok(())
}

#[test]
fn zero_padded_release_tag_resolves() -> Result<()> {
    let mut repo = release_history()?;
    repo.tag("1.02")?;
    repo.commit("Alice", "core/models.txt", "Fixed #108 -- after padded tag")?;
    let vcs = GitRepository::open_at(&repo.repo_path)?;

    let tags = vcs.tag_names()?;
    let windows = sequence_windows(&tags, 3, "HEAD")?;

    assert_eq!(windows[0].revision_range(), "1.02..HEAD");
    assert_eq!(
        vcs.commit_subjects(&windows[0], "core")?,
        vec!["Fixed #108 -- after padded tag"]
    );
    Ok(())
}

#[tokio::test]
async fn report_command_writes_csv_and_cache() -> Result<()> {
    let repo = release_history()?;
    let server = tracker_server().await;
    let out_dir = TempDir::new()?;
    let cache_path = out_dir.path().join("contributions.json");
    let report_path = out_dir.path().join("report.csv");

    let repo_arg = repo.repo_path.to_string_lossy().into_owned();
    let tracker_arg = format!("{}/jsonrpc", server.uri());
    let cache_arg = cache_path.to_string_lossy().into_owned();
    let report_arg = report_path.to_string_lossy().into_owned();
    let cli = Cli::try_parse_from([
        "relstats",
        "report",
        "--repo",
        &repo_arg,
        "--cutoff",
        "1",
        "--tip",
        "HEAD",
        "--tracker-url",
        &tracker_arg,
        "--cache",
        &cache_arg,
        "--output",
        &report_arg,
    ])?;
    let Commands::Report(report) = cli.command else {
        anyhow::bail!("expected report command");
    };

    // Path filter comes from the settings file when no flag is given
    if std::env::var_os("RELSTATS_PATH_FILTER").is_some() {
        return Ok(());
    }
    let settings = Settings {
        env: HashMap::from([("RELSTATS_PATH_FILTER".to_string(), "core".to_string())]),
    };
    report.run(&settings).await?;

    let csv = fs::read_to_string(&report_path)?;
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 3, "{csv}");
    assert_eq!(rows[1], "1.0,3,2,0,1,0,1,0,1");
    assert_eq!(rows[2], "1.1,2,2,1,0,0,1,1,0");
    assert_eq!(JsonFileCache::new(&cache_path).load()?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn report_over_real_repository() -> Result<()> {
    let repo = release_history()?;
    let server = tracker_server().await;
    let mut store = ContributionStore::default();

    let records = run_report(&repo, &server, &mut store).await?;

    assert_eq!(
        records,
        vec![
            ReleaseRecord {
                release: ReleaseTag::new(1, 0),
                contributions: 3,
                contributors: 2,
                new_contributors: 0,
                over_2_contributions: 1,
                over_10_contributions: 0,
                bugfixes: 1,
                optimizations: 0,
                features: 1,
            },
            ReleaseRecord {
                release: ReleaseTag::new(1, 1),
                contributions: 2,
                contributors: 2,
                new_contributors: 1,
                over_2_contributions: 0,
                over_10_contributions: 0,
                bugfixes: 1,
                optimizations: 1,
                features: 0,
            },
        ]
    );

    let backport = store
        .get(ReleaseTag::new(1, 1), "104")
        .ok_or_else(|| anyhow::anyhow!("ticket 104 not cached"))?;
    assert!(backport.backport);
    assert!(backport.release_blocker);
    assert_eq!(backport.kind, ContributionType::Bugfix);

    // Tickets outside the path filter are never looked up
    assert!(!store.contains(ReleaseTag::new(1, 0), "103"));
    assert_eq!(request_count(&server).await, 4);
    Ok(())
}

#[tokio::test]
async fn cached_run_is_idempotent_across_processes() -> Result<()> {
    let repo = release_history()?;
    let server = tracker_server().await;
    let cache_dir = TempDir::new()?;
    let cache = JsonFileCache::new(cache_dir.path().join("contributions.json"));

    let mut store = cache.load()?;
    let first = run_report(&repo, &server, &mut store).await?;
    cache.save(&store)?;
    let requests_after_first = request_count(&server).await;

    let mut reloaded = cache.load()?;
    assert_eq!(reloaded, store);
    let second = run_report(&repo, &server, &mut reloaded).await?;

    assert_eq!(first, second);
    assert_eq!(request_count(&server).await, requests_after_first);
    Ok(())
}

#[tokio::test]
async fn transient_tracker_failure_is_retried_next_run() -> Result<()> {
    let repo = release_history()?;
    let server = MockServer::start().await;
    mount_ticket(&server, 101, "Bug", "Normal").await;
    mount_ticket(&server, 102, "New feature", "Normal").await;
    mount_ticket(&server, 104, "defect", "Release blocker").await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"params": ["105"]})))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_ticket(&server, 105, "enhancement", "Normal").await;

    let mut store = ContributionStore::default();
    let first = run_report(&repo, &server, &mut store).await?;
    assert_eq!(first[1].optimizations, 0);
    assert!(!store.contains(ReleaseTag::new(1, 1), "105"));

    let second = run_report(&repo, &server, &mut store).await?;
    assert_eq!(second[1].optimizations, 1);
    assert_eq!(request_count(&server).await, 5);
    Ok(())
}

#[tokio::test]
async fn malformed_tracker_payload_is_skipped() -> Result<()> {
    let repo = release_history()?;
    let server = tracker_server().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"params": ["102"]})))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .with_priority(1)
        .mount(&server)
        .await;

    let mut store = ContributionStore::default();
    let records = run_report(&repo, &server, &mut store).await?;

    assert_eq!(records[0].features, 0);
    assert_eq!(records[0].bugfixes, 1);
    assert!(!store.contains(ReleaseTag::new(1, 0), "102"));
    Ok(())
}

#[tokio::test]
async fn unknown_category_fails_the_run() -> Result<()> {
    let repo = release_history()?;
    let server = tracker_server().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"params": ["101"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_response(101, "wontfix", "Normal")))
        .with_priority(1)
        .mount(&server)
        .await;

    let mut store = ContributionStore::default();
    let err = run_report(&repo, &server, &mut store)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("run should fail"))?;

    assert!(format!("{err:#}").contains("wontfix"), "{err:#}");
    Ok(())
}
