use crate::model::ExamResponse;
use crate::store::{ExamStore, KvStore};
use anyhow::Context;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
pub const BUNDLE_FORMAT_V1: &str = "examd-responses-v1";

#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub response_count: usize,
}

#[derive(Debug, Clone)]
pub struct BundleSummary {
    pub bundle_format: String,
    pub student_count: usize,
    pub response_count: usize,
}

/// `responses_<id>.json`, with path separators in the id flattened.
pub fn response_file_name(student_id: &str) -> String {
    let safe: String = student_id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    format!("responses_{safe}.json")
}

// Distinct ids can flatten to the same file name; later ones get a `-N` suffix.
fn unique_entry_name(student_id: &str, taken: &BTreeMap<String, &str>) -> String {
    let base = response_file_name(student_id);
    let name = format!("responses/{base}");
    if !taken.contains_key(&name) {
        return name;
    }
    let stem = base.trim_end_matches(".json");
    (2..)
        .map(|n| format!("responses/{stem}-{n}.json"))
        .find(|candidate| !taken.contains_key(candidate))
        .unwrap_or(name)
}

fn render(responses: &[ExamResponse]) -> anyhow::Result<String> {
    serde_json::to_string_pretty(responses).context("failed to serialize responses")
}

/// Writes every response of one student to `<out_dir>/responses_<id>.json`.
pub fn export_student_responses<K: KvStore>(
    store: &ExamStore<K>,
    student_id: &str,
    out_dir: &Path,
) -> anyhow::Result<ExportedFile> {
    let responses = store
        .responses_for_student(student_id)
        .context("failed to load responses")?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.to_string_lossy()))?;
    let path = out_dir.join(response_file_name(student_id));
    std::fs::write(&path, render(&responses)?)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;

    tracing::info!(student = %student_id, count = responses.len(), "exported responses");
    Ok(ExportedFile {
        path,
        response_count: responses.len(),
    })
}

/// Zips one responses file per student plus a manifest carrying sha256
/// digests of every entry.
pub fn export_responses_bundle<K: KvStore>(
    store: &ExamStore<K>,
    out_path: &Path,
) -> anyhow::Result<BundleSummary> {
    let all = store.responses().context("failed to load responses")?;
    let response_count = all.len();

    let mut by_student: BTreeMap<String, Vec<ExamResponse>> = BTreeMap::new();
    for r in all {
        by_student.entry(r.student_id.clone()).or_default().push(r);
    }

    let mut entries: Vec<(String, String)> = Vec::with_capacity(by_student.len());
    let mut students: BTreeMap<String, &str> = BTreeMap::new();
    for (student_id, responses) in &by_student {
        let name = unique_entry_name(student_id, &students);
        students.insert(name.clone(), student_id.as_str());
        entries.push((name, render(responses)?));
    }

    let digests: BTreeMap<&str, String> = entries
        .iter()
        .map(|(name, body)| (name.as_str(), format!("{:x}", Sha256::digest(body.as_bytes()))))
        .collect();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "studentCount": by_student.len(),
        "responseCount": response_count,
        "sha256": digests,
        "students": students,
    });

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (name, body) in &entries {
        zip.start_file(name.as_str(), opts)
            .with_context(|| format!("failed to start entry {name}"))?;
        zip.write_all(body.as_bytes())
            .with_context(|| format!("failed to write entry {name}"))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    tracing::info!(
        students = by_student.len(),
        responses = response_count,
        "exported response bundle"
    );
    Ok(BundleSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        student_count: by_student.len(),
        response_count,
    })
}
