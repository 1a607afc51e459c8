//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use patentyx_common::{QueryConfig, QueryDefaults, QueryOverride};
use patentyx_ingestion::pipeline::{run_ingestion, IngestionJob, IngestionProgress, PipelineDeps};
use patentyx_ingestion::{
    load_doc_numbers, summarise_coverage, ComponentPatterns, CoverageReport, EpoOpsProvider,
    FullTextFetcher, GooglePatentsFetcher, LocalFullTextFetcher, MemoryRepository, PatentProvider,
    PatentsViewProvider, WipoPatentscopeProvider,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{CoverageArgs, IngestArgs};

/// File override first, then command-line flags on top.
pub fn build_query(args: &IngestArgs) -> anyhow::Result<QueryConfig> {
    let from_file = match args.config.as_deref() {
        Some(path) => QueryOverride::from_path(path)
            .with_context(|| format!("loading query config {}", path.display()))?,
        None => QueryOverride::default(),
    };
    let from_flags = QueryOverride {
        per_page: args.per_page,
        max_pages: args.max_pages,
        ..Default::default()
    };
    Ok(QueryConfig::from_override(&QueryDefaults::default(), from_file.merge(from_flags)))
}

fn build_deps(args: &IngestArgs) -> anyhow::Result<PipelineDeps> {
    let providers: Vec<Arc<dyn PatentProvider>> = vec![
        Arc::new(PatentsViewProvider::new()?),
        Arc::new(WipoPatentscopeProvider::from_env()?),
        Arc::new(EpoOpsProvider::from_env()?),
    ];

    let mut fetchers: Vec<Arc<dyn FullTextFetcher>> = Vec::new();
    if let Some(dir) = args.full_text_dir.as_deref() {
        fetchers.push(Arc::new(LocalFullTextFetcher::new(dir)));
    }
    if !args.disable_google {
        fetchers.push(Arc::new(GooglePatentsFetcher::new()?));
    }

    Ok(PipelineDeps {
        providers,
        fetchers,
        patterns: ComponentPatterns::from_env(),
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub async fn ingest(args: IngestArgs) -> anyhow::Result<()> {
    let query = build_query(&args)?;
    let deps = build_deps(&args)?;
    let repo = MemoryRepository::new();

    let (tx, mut rx) = broadcast::channel::<IngestionProgress>(64);
    let progress_log = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            debug!(stage = %event.stage, "{}", event.message);
        }
    });

    let job = IngestionJob {
        query,
        manual_path: args.manual.clone(),
        snapshot_dir: args.save_raw.then(|| args.raw_dir.clone()),
        dry_run: args.dry_run,
    };
    let result = run_ingestion(job, &deps, &repo, Some(tx)).await?;
    let _ = progress_log.await;

    if let Some(path) = args.output.as_deref() {
        if args.dry_run {
            write_json(path, &result.records)?;
        } else {
            write_json(path, &repo.documents().await)?;
        }
        info!(path = %path.display(), "Wrote documents");
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn read_doc_numbers(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(load_doc_numbers(&content))
}

pub fn render_report(report: &CoverageReport) -> String {
    let mut out = format!(
        "Canonical patents: {}\nPresent in corpus: {}\nCoverage ratio: {:.2}%\n",
        report.canonical,
        report.present,
        report.coverage_ratio() * 100.0
    );
    if !report.missing.is_empty() {
        out.push_str("Missing doc numbers:\n");
        for doc in &report.missing {
            out.push_str(&format!(" - {doc}\n"));
        }
    }
    out
}

pub fn coverage(args: CoverageArgs) -> anyhow::Result<()> {
    let canonical = read_doc_numbers(&args.canonical)?;
    let present = read_doc_numbers(&args.present)?;
    let report = summarise_coverage(
        canonical.iter().map(String::as_str),
        present.iter().map(String::as_str),
    );

    print!("{}", render_report(&report));
    if let Some(path) = args.output.as_deref() {
        write_json(path, &report)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ingest_args(config: Option<PathBuf>) -> IngestArgs {
        IngestArgs {
            config,
            per_page: Some(7),
            max_pages: None,
            manual: None,
            full_text_dir: None,
            disable_google: true,
            dry_run: true,
            save_raw: false,
            raw_dir: PathBuf::from("data/raw"),
            output: None,
        }
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.yaml");
        std::fs::write(&path, "keywords: [\"flexizyme\"]\nper_page: 50\nmax_pages: 3\n").unwrap();

        let query = build_query(&ingest_args(Some(path))).unwrap();
        assert_eq!(query.keywords(), ["flexizyme".to_string()]);
        assert_eq!(query.per_page(), 7);
        assert_eq!(query.max_pages(), 3);
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(build_query(&ingest_args(Some(path))).is_err());
    }

    #[test]
    fn test_coverage_command_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("canonical.json");
        let present = dir.path().join("present.txt");
        let output = dir.path().join("out/report.json");
        std::fs::write(&canonical, r#"[{"doc_number": "US1"}, {"publication_number": "WO2"}]"#).unwrap();
        std::fs::write(&present, "us1\n").unwrap();

        coverage(CoverageArgs { canonical, present, output: Some(output.clone()) }).unwrap();

        let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(report["present"], 1);
        assert_eq!(report["missing"], serde_json::json!(["WO2"]));
    }

    #[test]
    fn test_render_report() {
        let report = summarise_coverage(["US1", "WO2"], ["US1"]);
        let text = render_report(&report);
        assert!(text.contains("Coverage ratio: 50.00%"));
        assert!(text.ends_with(" - WO2\n"));
    }
}
