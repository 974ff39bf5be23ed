// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::expand::NoAmbient;

const TOKEN: &str = ".testenv";

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).expect("Failed to write dotenv file");
}

/// A `full` directory holding all four categories for env `test`.
#[fixture]
fn full_tree() -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let full = tmp.path().join("full");
    std::fs::create_dir(&full).unwrap();

    write(&full, ".testenv", "APP_SETTING=public\nGLOBAL_ONLY=global\n");
    write(&full, ".testenv.test", "APP_SETTING=env\nENV_SETTING=env-public\n");
    write(&full, ".testenv.local", "APP_SECRET=global-secret\n");
    write(
        &full,
        ".testenv.test.local",
        "ENV_SECRET=env-secret\nAPP_SETTING=env-private\n",
    );

    // Deliberately unnormalized: provenance must keep it as given
    let path = format!("{}/./full", tmp.path().display());
    (tmp, path)
}

fn options(paths: Vec<String>, env: Option<&str>) -> CascadeOptions {
    CascadeOptions {
        dotenv_token: TOKEN.to_string(),
        paths,
        env: env.map(String::from),
        ..Default::default()
    }
}

fn read(options: &CascadeOptions, log: &mut ProvenanceLog) -> Environment {
    read_dotenv_cascade(options, &Expander::new(&NoAmbient), log).expect("Should read cascade")
}

#[rstest]
#[case(".env", None, None, ".env")]
#[case(".env", Some("dev"), None, ".env.dev")]
#[case(".env", None, Some("local"), ".env.local")]
#[case(".env", Some("dev"), Some("local"), ".env.dev.local")]
fn test_dotenv_filename(
    #[case] token: &str,
    #[case] env: Option<&str>,
    #[case] private: Option<&str>,
    #[case] expected: &str,
) {
    assert_eq!(dotenv_filename(token, env, private), expected);
}

#[rstest]
fn test_parse_dotenv_syntax() {
    let src = r#"
# comment line
BASIC=basic
export EXPORTED=yes
SPACED = spaced value
INLINE=value # trailing comment
SINGLE='single $NOT_EXPANDED_YET'
DOUBLE="line1\nline2"
BACKTICK=`tick`
MULTI="first
second"
EMPTY=
not a valid line
"#;
    let parsed = parse_dotenv(src);

    assert_eq!(parsed["BASIC"].as_deref(), Some("basic"));
    assert_eq!(parsed["EXPORTED"].as_deref(), Some("yes"));
    assert_eq!(parsed["SPACED"].as_deref(), Some("spaced value"));
    assert_eq!(parsed["INLINE"].as_deref(), Some("value"));
    assert_eq!(parsed["SINGLE"].as_deref(), Some("single $NOT_EXPANDED_YET"));
    assert_eq!(parsed["DOUBLE"].as_deref(), Some("line1\nline2"));
    assert_eq!(parsed["BACKTICK"].as_deref(), Some("tick"));
    assert_eq!(parsed["MULTI"].as_deref(), Some("first\nsecond"));
    assert_eq!(parsed["EMPTY"].as_deref(), Some(""));
    assert!(!parsed.contains_key("not"));
}

#[rstest]
fn test_parse_dotenv_crlf() {
    let parsed = parse_dotenv("A=1\r\nB=2\r\n");
    assert_eq!(parsed["A"].as_deref(), Some("1"));
    assert_eq!(parsed["B"].as_deref(), Some("2"));
}

#[rstest]
fn test_cascade_precedence(full_tree: (TempDir, String)) {
    let (_tmp, path) = full_tree;
    let mut log = ProvenanceLog::new();
    let env = read(&options(vec![path], Some("test")), &mut log);

    assert_eq!(env["APP_SETTING"].as_deref(), Some("env-private"));
    assert_eq!(env["GLOBAL_ONLY"].as_deref(), Some("global"));
    assert_eq!(env["ENV_SETTING"].as_deref(), Some("env-public"));
    assert_eq!(env["APP_SECRET"].as_deref(), Some("global-secret"));
    assert_eq!(env["ENV_SECRET"].as_deref(), Some("env-secret"));
}

#[rstest]
fn test_cascade_provenance_path_fidelity(full_tree: (TempDir, String)) {
    let (_tmp, path) = full_tree;
    let mut log = ProvenanceLog::new();
    read(&options(vec![path.clone()], Some("test")), &mut log);

    let history = log.history("APP_SETTING");
    assert_eq!(history.len(), 3);
    assert_eq!(
        history[0],
        ProvenanceEntry::File {
            op: Op::Set,
            scope: Scope::Global,
            privacy: Privacy::Public,
            env: None,
            path: path.clone(),
            file: ".testenv".to_string(),
        }
    );
    assert_eq!(
        history[1],
        ProvenanceEntry::File {
            op: Op::Set,
            scope: Scope::Env,
            privacy: Privacy::Public,
            env: Some("test".to_string()),
            path: path.clone(),
            file: ".testenv.test".to_string(),
        }
    );
    assert_eq!(
        history[2],
        ProvenanceEntry::File {
            op: Op::Set,
            scope: Scope::Env,
            privacy: Privacy::Private,
            env: Some("test".to_string()),
            path,
            file: ".testenv.test.local".to_string(),
        }
    );
}

#[rstest]
fn test_relative_search_path_recorded_verbatim() {
    // Relative to the test's working directory, never made absolute
    let tmp = TempDir::new_in(".").expect("Failed to create dir under cwd");
    let name = tmp.path().file_name().unwrap().to_string_lossy().to_string();
    let full = tmp.path().join("full");
    std::fs::create_dir(&full).unwrap();
    write(&full, ".testenv", "APP_SETTING=public\n");
    let path = format!("./{name}/full");

    let mut log = ProvenanceLog::new();
    let env = read(&options(vec![path.clone()], None), &mut log);

    assert_eq!(env["APP_SETTING"].as_deref(), Some("public"));
    assert_eq!(
        log.last("APP_SETTING"),
        Some(&ProvenanceEntry::File {
            op: Op::Set,
            scope: Scope::Global,
            privacy: Privacy::Public,
            env: None,
            path,
            file: ".testenv".to_string(),
        })
    );
}

#[rstest]
fn test_no_env_skips_env_files(full_tree: (TempDir, String)) {
    let (_tmp, path) = full_tree;
    let mut log = ProvenanceLog::new();
    let env = read(&options(vec![path], None), &mut log);

    assert_eq!(env["APP_SETTING"].as_deref(), Some("public"));
    assert!(!env.contains_key("ENV_SETTING"));
    assert!(!env.contains_key("ENV_SECRET"));
    assert!(env.contains_key("APP_SECRET"));
}

#[rstest]
#[case::no_public(true, false, false, false, &["APP_SECRET", "APP_SETTING", "ENV_SECRET"])]
#[case::no_private(false, true, false, false, &["APP_SETTING", "ENV_SETTING", "GLOBAL_ONLY"])]
#[case::no_global(false, false, true, false, &["APP_SETTING", "ENV_SECRET", "ENV_SETTING"])]
#[case::no_env(false, false, false, true, &["APP_SECRET", "APP_SETTING", "GLOBAL_ONLY"])]
fn test_exclusion_flags(
    full_tree: (TempDir, String),
    #[case] exclude_public: bool,
    #[case] exclude_private: bool,
    #[case] exclude_global: bool,
    #[case] exclude_env: bool,
    #[case] expected_keys: &[&str],
) {
    let (_tmp, path) = full_tree;
    let options = CascadeOptions {
        exclude_public,
        exclude_private,
        exclude_global,
        exclude_env,
        ..options(vec![path], Some("test"))
    };
    let mut log = ProvenanceLog::new();
    let env = read(&options, &mut log);

    let mut keys: Vec<&str> = env.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, expected_keys);
}

#[rstest]
fn test_later_paths_override_earlier() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    std::fs::create_dir(&first).unwrap();
    std::fs::create_dir(&second).unwrap();
    write(&first, TOKEN, "SHARED=first\nFIRST_ONLY=1\n");
    write(&second, TOKEN, "SHARED=second\n");

    let paths = vec![
        first.display().to_string(),
        second.display().to_string(),
    ];
    let mut log = ProvenanceLog::new();
    let env = read(&options(paths.clone(), None), &mut log);

    assert_eq!(env["SHARED"].as_deref(), Some("second"));
    assert_eq!(env["FIRST_ONLY"].as_deref(), Some("1"));

    let history = log.history("SHARED");
    assert_eq!(history.len(), 2);
    assert!(matches!(&history[0], ProvenanceEntry::File { path, .. } if *path == paths[0]));
    assert!(matches!(&history[1], ProvenanceEntry::File { path, .. } if *path == paths[1]));
}

#[rstest]
fn test_missing_paths_are_not_errors() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("does-not-exist").display().to_string();

    let mut log = ProvenanceLog::new();
    let env = read(&options(vec![missing], Some("test")), &mut log);

    assert!(env.is_empty());
    assert!(log.is_empty());
}

#[rstest]
fn test_cascade_expands_progressively() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        TOKEN,
        "HOST=localhost\nURL=http://${HOST}:8080\nESCAPED=\\$HOST\n",
    );
    write(tmp.path(), ".testenv.local", "URL=$URL/private\n");

    let mut log = ProvenanceLog::new();
    let env = read(&options(vec![tmp.path().display().to_string()], None), &mut log);

    // URL keeps its first-seen position but takes the private value,
    // which can only see keys expanded before it
    assert_eq!(env["HOST"].as_deref(), Some("localhost"));
    assert_eq!(env["URL"].as_deref(), Some("/private"));
    assert_eq!(env["ESCAPED"].as_deref(), Some("$HOST"));
}

#[rstest]
fn test_empty_value_records_unset() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), TOKEN, "CLEARED=something\n");
    write(tmp.path(), ".testenv.local", "CLEARED=\n");

    let mut log = ProvenanceLog::new();
    let env = read(&options(vec![tmp.path().display().to_string()], None), &mut log);

    assert_eq!(env["CLEARED"], None);
    let ops: Vec<Op> = log.history("CLEARED").iter().map(ProvenanceEntry::op).collect();
    assert_eq!(ops, vec![Op::Set, Op::Unset]);
}
