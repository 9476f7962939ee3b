use bugrisk_lib::analysis::labeling::KeywordClassifier;
use bugrisk_lib::commands::dataset::{assemble_dataset, build_dataset};
use bugrisk_lib::commands::git::mine_git_history;
use bugrisk_lib::commands::scoring::score_repository;
use bugrisk_lib::commands::settings::Settings;
use bugrisk_lib::commands::store::{load_artifact, load_dataset};
use bugrisk_lib::commands::train::{train_from_csv, TrainOptions};
use bugrisk_lib::ml::boosting::BoostingParams;
use bugrisk_lib::ml::forest::ForestParams;
use bugrisk_lib::ml::pipeline::ModelSpec;
use bugrisk_lib::Error;
use git2::{Repository, Signature, Time};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    repo: Repository,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let repo = Repository::init(dir.path()).expect("init git repo");
        Self { dir, repo }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.path().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, contents).expect("write file");
    }

    /// Stages the given files and commits them on HEAD. `seconds` overrides
    /// the author time.
    fn commit(&self, files: &[&str], message: &str, seconds: Option<i64>) {
        let mut index = self.repo.index().expect("open git index");
        for file in files {
            index.add_path(Path::new(file)).expect("add file");
        }
        index.write().expect("write git index");
        let tree_id = index.write_tree().expect("write tree");
        let tree = self.repo.find_tree(tree_id).expect("find tree");

        let signature = match seconds {
            Some(secs) => Signature::new("Test User", "test@example.com", &Time::new(secs, 0)),
            None => Signature::now("Test User", "test@example.com"),
        }
        .expect("signature");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .expect("commit");
    }
}

fn numbered_lines(n: usize) -> String {
    (0..n).map(|i| format!("value_{i} = {i}\n")).collect()
}

#[test]
fn two_commits_on_one_file_with_a_bugfix() {
    let fx = Fixture::new();
    fx.write("app.py", &numbered_lines(50));
    fx.commit(&["app.py"], "initial add", None);
    fx.write("app.py", &(numbered_lines(50) + "def f():\n    return 1\n"));
    fx.commit(&["app.py"], "fix null pointer", None);

    let history = mine_git_history(fx.path(), 12, &KeywordClassifier::default()).expect("mine history");
    assert_eq!(history.len(), 1);
    let app = &history[0];
    assert_eq!(app.file, "app.py");
    assert_eq!(app.commits, 2);
    assert_eq!(app.churn_added, 52);
    assert_eq!(app.churn_deleted, 0);
    assert_eq!(app.distinct_authors, 1);
    assert_eq!(app.buggy_label, 1);
}

#[test]
fn commits_outside_the_window_give_no_git_data() {
    let fx = Fixture::new();
    fx.write("old.py", "x = 1\n");
    let two_years_ago = chrono::Utc::now().timestamp() - 730 * 24 * 3600;
    fx.commit(&["old.py"], "fix ancient bug", Some(two_years_ago));

    let history = mine_git_history(fx.path(), 1, &KeywordClassifier::default()).expect("mine history");
    assert!(history.is_empty());

    let err = assemble_dataset(fx.path(), 1, &Settings::default()).unwrap_err();
    assert!(matches!(err, Error::NoGitData));
    assert!(err.to_string().contains("No git data mined"));
}

#[test]
fn dataset_csv_has_the_expected_header_and_drops_empty_files() {
    let fx = Fixture::new();
    fx.write("src/core.py", "def run(x):\n    if x:\n        return 1\n    return 0\n");
    fx.write("src/empty.py", "");
    fx.write("notes.md", "# notes\n");
    fx.commit(&["src/core.py", "src/empty.py", "notes.md"], "initial import", None);

    let out = fx.path().join("out/data.csv");
    let build = build_dataset(fx.path(), 12, &out, &Settings::default()).expect("build dataset");
    assert_eq!(build.rows.len(), 1);

    let text = fs::read_to_string(&out).expect("read csv");
    assert_eq!(
        text.lines().next().expect("header"),
        "file,loc,sloc,comments,multi,blank,avg_cc,max_cc,mi,commits,churn_added,churn_deleted,distinct_authors,last_modified_days,buggy_label"
    );
    let rows = load_dataset(&out).expect("load csv");
    assert_eq!(rows[0].file, "src/core.py");
    assert_eq!(rows[0].loc, 4);
    assert_eq!(rows[0].max_cc, 2.0);
    assert_eq!(rows[0].buggy_label, 0);
}

fn branchy_module(branches: usize) -> String {
    let mut source = String::from("def handle(x):\n");
    for i in 0..branches {
        source.push_str(&format!("    if x == {i}:\n        return {i}\n"));
    }
    source.push_str("    return -1\n");
    source
}

#[test]
fn dataset_trains_and_scores_end_to_end() {
    let fx = Fixture::new();
    let mut all = Vec::new();
    for i in 0..6 {
        let calm = format!("src/calm_{i}.py");
        let hot = format!("src/hot_{i}.py");
        fx.write(&calm, &numbered_lines(3 + i));
        fx.write(&hot, &branchy_module(6 + i));
        all.push(calm);
        all.push(hot);
    }
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    fx.commit(&refs, "initial import", None);

    for i in 0..6 {
        let hot = format!("src/hot_{i}.py");
        fx.write(&hot, &branchy_module(8 + i));
        fx.commit(&[hot.as_str()], &format!("fix crash in handler {i}"), None);
    }

    let data = fx.path().join("data.csv");
    let build = build_dataset(fx.path(), 12, &data, &Settings::default()).expect("build dataset");
    assert_eq!(build.rows.len(), 12);
    assert_eq!(build.rows.iter().filter(|r| r.buggy_label == 1).count(), 6);

    let model = fx.path().join("models/model.json");
    let options = TrainOptions {
        folds: 3,
        seed: 7,
        candidates: vec![
            ModelSpec::RandomForest(ForestParams {
                n_estimators: 15,
                ..ForestParams::default()
            }),
            ModelSpec::GradientBoosting(BoostingParams {
                n_estimators: 15,
                ..BoostingParams::default()
            }),
        ],
    };
    let outcome = train_from_csv(&data, &model, &options).expect("train");
    assert_eq!(outcome.reports.len(), 2);
    assert_eq!(outcome.artifact.feature_names.len(), 13);

    let artifact = load_artifact(&model).expect("load artifact");
    assert_eq!(artifact.artifact_id, outcome.artifact.artifact_id);

    let report = score_repository(fx.path(), &artifact, 6, &Settings::default()).expect("score");
    assert_eq!(report.files.len(), 12);
    assert!(report.alignment.missing.is_empty());
    assert!(report.files.iter().all(|f| (0.0..=1.0).contains(&f.risk)));
    assert!(report.files.windows(2).all(|w| w[0].risk >= w[1].risk));
    assert!(report.files[0].row.file.starts_with("src/hot_"));
}
