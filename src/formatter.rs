/*!
 * Prompt rendering for selected files
 *
 * Two layouts are supported:
 *
 * - `default`: `<path>\n---\n<content>\n---` per file, separated by a blank line
 * - `claude-xml`: a single `<documents>` block holding one numbered
 *   `<document>` per file
 *
 * Content is inserted verbatim in both layouts.
 */

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::{debug, error};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{PromptError, Result};
use crate::fs::FileSystem;
use crate::types::SelectedFileRecord;

/// Source name of the project-structure pseudo-document
pub const PROJECT_STRUCTURE_SOURCE: &str = "project-structure";

/// Serialization of a set of files into one prompt
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    /// Path, `---`, content, `---`
    Default,
    /// `<documents>` with indexed `<document>` entries
    #[default]
    ClaudeXml,
}

/// Options for one generation request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptOptions {
    /// Output layout
    pub format: OutputFormat,
    /// Project-structure diagram placed before the files, when enabled
    pub project_structure: Option<String>,
}

impl PromptOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            project_structure: None,
        }
    }

    /// Prefix the prompt with a project-structure document
    pub fn with_project_structure(mut self, diagram: impl Into<String>) -> Self {
        self.project_structure = Some(diagram.into());
        self
    }
}

/// Renders selected files into a prompt
pub struct PromptWriter {
    options: PromptOptions,
}

impl PromptWriter {
    pub fn new(options: PromptOptions) -> Self {
        Self { options }
    }

    /// Read every file and render the prompt
    ///
    /// Files are read in parallel but rendered in the order given. Any read
    /// or decode failure fails the whole request.
    pub fn generate(&self, fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<String> {
        let records = read_records(fs, paths).map_err(|e| {
            error!("Error generating prompt: {}", e);
            e
        })?;
        Ok(self.render(records))
    }

    /// Render already-read records
    pub fn render(&self, records: Vec<SelectedFileRecord>) -> String {
        let mut documents = Vec::with_capacity(records.len() + 1);
        if let Some(diagram) = &self.options.project_structure {
            documents.push(SelectedFileRecord::new(PROJECT_STRUCTURE_SOURCE, diagram.as_str()));
        }
        documents.extend(records);
        format_output(&documents, self.options.format)
    }
}

/// Read and render the prompt for `paths`
pub fn generate_prompt(
    fs: &dyn FileSystem,
    paths: &[PathBuf],
    options: &PromptOptions,
) -> Result<String> {
    PromptWriter::new(options.clone()).generate(fs, paths)
}

/// Read each file as UTF-8, keeping the requested order
pub fn read_records(fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<Vec<SelectedFileRecord>> {
    debug!("Reading {} selected files", paths.len());
    paths
        .par_iter()
        .map(|path| read_record(fs, path))
        .collect()
}

fn read_record(fs: &dyn FileSystem, path: &Path) -> Result<SelectedFileRecord> {
    let bytes = fs.read(path).map_err(|source| PromptError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8(bytes).map_err(|_| PromptError::Decode {
        path: path.to_path_buf(),
    })?;
    Ok(SelectedFileRecord::new(path.to_string_lossy(), content))
}

/// Render records in the requested layout
pub fn format_output(files: &[SelectedFileRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Default => format_default(files),
        OutputFormat::ClaudeXml => format_claude_xml(files),
    }
}

/// Plain layout
pub fn format_default(files: &[SelectedFileRecord]) -> String {
    files
        .iter()
        .map(|file| format!("{}\n---\n{}\n---", file.path, file.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Tagged-document layout, indices are 1-based in input order
pub fn format_claude_xml(files: &[SelectedFileRecord]) -> String {
    let documents = files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            format!(
                "<document index=\"{}\">\n<source>{}</source>\n<document_content>\n{}\n</document_content>\n</document>",
                i + 1,
                file.path,
                file.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("<documents>\n{}\n</documents>", documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use std::fs;
    use tempfile::tempdir;

    fn record(path: &str, content: &str) -> SelectedFileRecord {
        SelectedFileRecord::new(path, content)
    }

    #[test]
    fn test_default_format() {
        let out = format_default(&[record("/p/a.ts", "let a = 1;"), record("/p/b.ts", "b")]);
        assert_eq!(out, "/p/a.ts\n---\nlet a = 1;\n---\n\n/p/b.ts\n---\nb\n---");
    }

    #[test]
    fn test_default_format_splits_back_into_files() {
        let files = [record("/p/z.txt", "first\nline two"), record("/p/a.txt", "second")];
        let out = format_default(&files);

        let blocks: Vec<&str> = out.split("\n---\n\n").collect();
        assert_eq!(blocks.len(), 2);
        for (block, file) in blocks.iter().zip(files.iter()) {
            let block = block.strip_suffix("\n---").unwrap_or(*block);
            let (path, content) = block.split_once("\n---\n").unwrap();
            assert_eq!(path, file.path);
            assert_eq!(content, file.content);
        }
    }

    #[test]
    fn test_xml_indices_follow_input_order() {
        let out = format_claude_xml(&[record("/p/z.rs", "z"), record("/p/a.rs", "a")]);
        assert!(out.contains("<document index=\"1\">\n<source>/p/z.rs</source>"));
        assert!(out.contains("<document index=\"2\">\n<source>/p/a.rs</source>"));
    }

    #[test]
    fn test_xml_empty_selection() {
        assert_eq!(format_claude_xml(&[]), "<documents>\n\n</documents>");
    }

    #[test]
    fn test_project_structure_shifts_indices() {
        let writer = PromptWriter::new(
            PromptOptions::new(OutputFormat::ClaudeXml).with_project_structure("p\n└── a.ts"),
        );
        let out = writer.render(vec![record("/p/a.ts", "A")]);

        assert!(out.starts_with(
            "<documents>\n<document index=\"1\">\n<source>project-structure</source>\n<document_content>\np\n└── a.ts\n</document_content>\n</document>\n<document index=\"2\">"
        ));
        assert_eq!(out.matches("<documents>").count(), 1);
        assert_eq!(out.matches("</documents>").count(), 1);
    }

    #[test]
    fn test_project_structure_default_layout() {
        let writer = PromptWriter::new(
            PromptOptions::new(OutputFormat::Default).with_project_structure("p\n└── a.ts"),
        );
        let out = writer.render(vec![record("/p/a.ts", "A")]);
        assert_eq!(
            out,
            "project-structure\n---\np\n└── a.ts\n---\n\n/p/a.ts\n---\nA\n---"
        );
    }

    #[test]
    fn test_generate_reads_in_requested_order() -> Result<()> {
        let temp_dir = tempdir()?;
        let paths: Vec<PathBuf> = (0..16)
            .map(|i| {
                let path = temp_dir.path().join(format!("f{:02}.txt", 15 - i));
                fs::write(&path, format!("content {}", 15 - i)).map(|_| path)
            })
            .collect::<std::io::Result<_>>()?;

        let out = generate_prompt(&LocalFs, &paths, &PromptOptions::new(OutputFormat::Default))?;
        let expected: Vec<String> = paths
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}\n---\ncontent {}\n---", p.display(), 15 - i))
            .collect();
        assert_eq!(out, expected.join("\n\n"));
        Ok(())
    }

    #[test]
    fn test_missing_file_fails_whole_request() -> Result<()> {
        let temp_dir = tempdir()?;
        let present = temp_dir.path().join("present.txt");
        fs::write(&present, "here")?;
        let missing = temp_dir.path().join("missing.txt");

        let err = generate_prompt(
            &LocalFs,
            &[present, missing.clone()],
            &PromptOptions::default(),
        )
        .unwrap_err();
        match err {
            PromptError::FileRead { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {}", other),
        }
        Ok(())
    }

    #[test]
    fn test_non_utf8_file_fails() -> Result<()> {
        let temp_dir = tempdir()?;
        let binary = temp_dir.path().join("blob.bin");
        fs::write(&binary, [0xffu8, 0xfe, 0x00])?;

        let err = generate_prompt(&LocalFs, &[binary], &PromptOptions::default()).unwrap_err();
        assert!(matches!(err, PromptError::Decode { .. }));
        Ok(())
    }

    #[test]
    fn test_output_format_names() {
        assert_eq!(OutputFormat::ClaudeXml.to_string(), "claude-xml");
        assert_eq!("default".parse::<OutputFormat>().unwrap(), OutputFormat::Default);
        assert_eq!(
            serde_json::to_string(&OutputFormat::ClaudeXml).unwrap(),
            "\"claude-xml\""
        );
        assert_eq!(OutputFormat::default(), OutputFormat::ClaudeXml);
    }
}
