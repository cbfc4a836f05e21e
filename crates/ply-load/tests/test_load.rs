use async_trait::async_trait;
use indexmap::IndexMap;
use ply_core::value::{EvalOptions, ValuesLocation};
use ply_load::{FileAccess, FlowLoader, ListOptions, LoadOptions, RequestLoader, ValuesLoader};
use ply_values::Values;

static INIT_TEST_LOGGING: std::sync::Once = std::sync::Once::new();

fn init_test_logging() {
    INIT_TEST_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("ply_load=debug")
            .with_test_writer()
            .try_init();
    });
}

/// In-memory [`FileAccess`] over a fixed path/contents map.
struct StubFiles {
    files: IndexMap<String, String>,
}

impl StubFiles {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, contents)| ((*path).to_owned(), (*contents).to_owned()))
                .collect(),
        }
    }
}

#[async_trait]
impl FileAccess for StubFiles {
    async fn read_text_file(&self, path: &str) -> ply_load::Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }

    async fn file_list(
        &self,
        dir: &str,
        options: &ListOptions,
    ) -> ply_load::Result<IndexMap<String, String>> {
        let mut paths: Vec<&String> = self
            .files
            .keys()
            .filter(|path| path.starts_with(dir))
            .collect();
        paths.sort();
        Ok(paths
            .into_iter()
            .filter(|path| {
                options.patterns.iter().any(|pattern| {
                    // Suffix match is enough for these fixtures.
                    pattern
                        .strip_prefix("**/*")
                        .is_some_and(|suffix| path.ends_with(suffix))
                })
            })
            .map(|path| (path.clone(), self.files[path].clone()))
            .collect())
    }
}

const MOVIES_FLOW: &str = r#"
attributes:
  values: '[["year", "1931", "true", ""], ["rating", "", "", ""]]'
steps:
  - id: s2
    name: |-
      Get
      Movies
    path: request
  - id: s1
    name: Start
    path: start
    links:
      - id: l1
        to: s2
        event: Finish
  - id: s3
    name: Orphan
    path: request
subflows:
  - id: f2
    name: After All
    attributes: { when: After }
    steps: []
  - id: f1
    name: Before All
    attributes: { when: Before }
    steps:
      - id: s1
        name: Start
        path: start
"#;

#[tokio::test]
async fn test_load_flows_normalized() {
    init_test_logging();
    let files = StubFiles::new(&[
        ("test/flows/movies.ply.flow", MOVIES_FLOW),
        ("test/flows/broken.ply.flow", "- not\n- a\n- mapping\n"),
    ]);
    let loader = FlowLoader::new(&files, LoadOptions::default());

    let flows = loader.load_flows("test/flows").await.unwrap();
    // The broken document is skipped, not fatal.
    assert_eq!(flows.len(), 1);

    let flow = &flows[0];
    assert_eq!(flow.name, "movies.ply.flow");
    assert_eq!(flow.path, "test/flows/movies.ply.flow");

    // Start-anchored order, orphan dropped, newlines collapsed.
    let step_ids: Vec<&str> = flow.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(step_ids, ["s1", "s2"]);
    assert_eq!(flow.steps[1].name, "Get Movies");

    // Before subflow sorts ahead of After.
    let subflow_ids: Vec<&str> = flow.subflows.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(subflow_ids, ["f1", "f2"]);
    assert_eq!(flow.source, None);
}

#[tokio::test]
async fn test_load_flow_with_source() {
    let files = StubFiles::new(&[("test/flows/movies.ply.flow", MOVIES_FLOW)]);
    let loader = FlowLoader::new(
        &files,
        LoadOptions {
            suite_source: true,
        },
    );

    let flow = loader
        .load_flow("test/flows", "test/flows/movies.ply.flow")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flow.source.as_deref(), Some(MOVIES_FLOW));

    let missing = loader
        .load_flow("test/flows", "test/flows/nope.ply.flow")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_bad_flow_document_is_an_error() {
    let files = StubFiles::new(&[("test/flows/null.ply.flow", "~\n")]);
    let loader = FlowLoader::new(&files, LoadOptions::default());
    let result = loader
        .load_flow("test/flows", "test/flows/null.ply.flow")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_load_request_suites() {
    let files = StubFiles::new(&[(
        "test/requests/movies.ply.yaml",
        r#"
getMovies:
  method: GET
  url: ${baseUrl}/movies?year=${year}
  headers:
    Accept: application/json
createMovie:
  method: POST
  url: ${baseUrl}/movies
  body: '{ "title": "${title}" }'
"#,
    )]);
    let loader = RequestLoader::new(&files, LoadOptions::default());

    let suites = loader.load_request_suites("test/requests").await.unwrap();
    assert_eq!(suites.len(), 1);
    let suite = &suites[0];
    assert_eq!(suite.name, "movies.ply.yaml");
    let names: Vec<&str> = suite.requests.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["getMovies", "createMovie"]);
    assert_eq!(
        ply_values::request_expressions(&suite.requests[0], false),
        ["${baseUrl}", "${year}"]
    );
}

#[tokio::test]
async fn test_load_file_values_precedence() {
    init_test_logging();
    let files = StubFiles::new(&[
        ("test/values/global.json", r#"{ "a": 1, "b": 1 }"#),
        ("test/values/localhost.json", r#"{ "a": 2 }"#),
        ("test/values/broken.json", "not json"),
    ]);
    let loader = ValuesLoader::new(&files, EvalOptions::default());

    let holders = loader
        .load_file_values(&[
            "test/values/global.json".to_owned(),
            "test/values/localhost.json".to_owned(),
            "test/values/broken.json".to_owned(),
            "test/values/missing.json".to_owned(),
        ])
        .await
        .unwrap();
    // Broken and missing files are skipped.
    assert_eq!(holders.len(), 2);

    let mut values = Values::new(holders, EvalOptions::default());
    let located = values.get_value("${a}").unwrap();
    assert_eq!(located.value, "2");
    assert_eq!(
        located.location,
        Some(ValuesLocation::new("test/values/localhost.json"))
    );
}

#[tokio::test]
async fn test_read_flow_values() {
    let files = StubFiles::new(&[]);
    let loader = ValuesLoader::new(&files, EvalOptions::default());

    let mut flow = ply_core::flow::Flow {
        path: "test/flows/movies.ply.flow".to_owned(),
        ..Default::default()
    };
    flow.attributes.insert(
        ply_core::flow::attr::VALUES.to_owned(),
        r#"[
            ["year", "1931", "true", ""],
            ["rating", "${defaultRating}", "", ""],
            ["title", "", "", "${titleRequired}"]
        ]"#
        .to_owned(),
    );

    let context = serde_json::json!({ "defaultRating": "5", "titleRequired": "true" });
    let holder = loader.read_flow_values(&flow, Some(&context)).unwrap();

    assert_eq!(holder.values["year"], "1931");
    assert_eq!(holder.values["rating"], "5");
    assert_eq!(holder.required, ["year", "title"]);
    assert_eq!(
        holder.location,
        Some(ValuesLocation::new("test/flows/movies.ply.flow"))
    );
}
