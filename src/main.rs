//! Term Annotator
//!
//! Loads an RDFa-annotated HTML document and prints a JSON summary of its
//! annotations. With `ANNOTATOR_EMIT_HTML=1` the normalized document goes
//! to stdout and the summary to stderr.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use term_annotator::annotation::AnnotationView;
use term_annotator::{AnnotatorSession, Config, Services};

const USAGE: &str = "usage: term-annotator <document.html> [document-iri]";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    document: String,
    prefixes: BTreeMap<String, String>,
    min_score: f64,
    annotations: Vec<AnnotationView>,
}

fn load_document(path: &Path, document_iri: &str, config: &Config) -> Result<AnnotatorSession> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    AnnotatorSession::load(&html, document_iri, Services::detached(), config)
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn summarize(session: &AnnotatorSession, config: &Config) -> Summary {
    Summary {
        document: session.document_iri().to_string(),
        prefixes: session
            .prefix_map()
            .iter()
            .map(|(prefix, namespace)| (prefix.to_string(), namespace.to_string()))
            .collect(),
        min_score: config.annotation.min_score,
        annotations: session.annotations(Some(config.annotation.min_score)),
    }
}

fn default_iri(path: &Path) -> String {
    format!("file://{}", path.display())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "term_annotator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = env::args().skip(1);
    let path = args.next().map(PathBuf::from).context(USAGE)?;
    let document_iri = args.next().unwrap_or_else(|| default_iri(&path));
    let config = Config::from_env();

    let session = load_document(&path, &document_iri, &config)?;
    let summary = serde_json::to_string_pretty(&summarize(&session, &config))?;
    tracing::info!("{} annotations reported", session.annotations(Some(config.annotation.min_score)).len());

    if env::var("ANNOTATOR_EMIT_HTML").is_ok_and(|v| v == "1") {
        eprintln!("{}", summary);
        print!("{}", session.to_html());
    } else {
        println!("{}", summary);
    }
    Ok(())
}
