//! Scripted in-memory container backend

#![allow(dead_code)]

use async_trait::async_trait;
use infrarun_container::{encode_frame, ContainerBackend, ContainerSpec, StreamType, VolumeBind};
use infrarun_foundation::{Error, Result};
use infrarun_report::ParserRegistry;
use infrarun_tool::{OutputStrategy, Parameters, PathRuleSpec, ToolDefinition, ToolManifest};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::Notify;

/// What a fake container does, keyed by image
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// (guest dir, file name, content) written into the matching bind
    pub file: Option<(String, String, Vec<u8>)>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i64,
    pub missing_image: bool,
    pub hang: bool,
}

impl Script {
    pub fn file(guest_dir: &str, name: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file: Some((guest_dir.to_string(), name.to_string(), content.into())),
            ..Default::default()
        }
    }

    pub fn stdout(content: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: content.into(),
            ..Default::default()
        }
    }

    pub fn with_stderr(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.stderr = content.into();
        self
    }

    pub fn exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    pub fn missing_image() -> Self {
        Self {
            missing_image: true,
            ..Default::default()
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }
}

#[derive(Default)]
pub struct FakeBackend {
    scripts: HashMap<String, Script>,
    specs: Mutex<Vec<ContainerSpec>>,
    output_dirs: Mutex<Vec<PathBuf>>,
    /// Signalled when a hanging container starts
    pub hanging: Notify,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, image: &str, script: Script) -> Self {
        self.scripts.insert(image.to_string(), script);
        self
    }

    /// Every container spec that was run
    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.specs.lock().unwrap().clone()
    }

    pub fn started_images(&self) -> Vec<String> {
        let mut images: Vec<_> = self.specs().into_iter().map(|s| s.image).collect();
        images.sort();
        images
    }

    /// Host directories that were bound for file output
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        self.output_dirs.lock().unwrap().clone()
    }

    fn script(&self, image: &str) -> Result<&Script> {
        self.scripts
            .get(image)
            .ok_or_else(|| Error::Docker(format!("no script for {}", image)))
    }
}

#[async_trait]
impl ContainerBackend for FakeBackend {
    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.script(image)?.missing_image {
            return Err(Error::ImageUnavailable {
                image: image.to_string(),
                reason: "not found".to_string(),
            });
        }
        Ok(())
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.specs.lock().unwrap().push(spec.clone());
        let script = self.script(&spec.image)?.clone();

        if script.hang {
            self.hanging.notify_one();
            return futures::future::pending::<Result<String>>().await;
        }

        if let Some((guest_dir, name, content)) = &script.file {
            let bind: &VolumeBind = spec
                .binds
                .iter()
                .find(|b| &b.guest == guest_dir)
                .ok_or_else(|| Error::Docker(format!("{} is not bound", guest_dir)))?;
            self.output_dirs.lock().unwrap().push(bind.host.clone());
            std::fs::write(bind.host.join(name), content)?;
        }

        if script.exit_code != 0 {
            return Err(Error::ContainerFailed {
                container_id: spec.image.clone(),
                exit_code: script.exit_code,
            });
        }
        Ok(spec.image.clone())
    }

    async fn fetch_logs(&self, container_id: &str) -> Result<Vec<u8>> {
        let script = self.script(container_id)?;
        let mut framed = Vec::new();
        encode_frame(StreamType::Stderr, &script.stderr, &mut framed);
        encode_frame(StreamType::Stdout, &script.stdout, &mut framed);
        Ok(framed)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Compile a tool definition for tests
pub fn tool(
    name: &str,
    input_path: &str,
    output: OutputStrategy,
    parser: &str,
    rules: &[(&str, &str)],
) -> ToolDefinition {
    let manifest = ToolManifest {
        name: name.to_string(),
        image: name.to_string(),
        cmd: vec!["scan".to_string(), input_path.to_string()],
        input_path: input_path.to_string(),
        output,
        parser: parser.to_string(),
        path_transformation: rules
            .iter()
            .map(|(pattern, replacement)| PathRuleSpec {
                pattern: pattern.to_string(),
                replacement: replacement.to_string(),
            })
            .collect(),
        default_options: Parameters::new(),
        success_exit_codes: vec![0],
    };
    ToolDefinition::compile(manifest, &ParserRegistry::builtin()).unwrap()
}

pub fn file_output(path: &str, file: &str) -> OutputStrategy {
    OutputStrategy::File {
        path: path.to_string(),
        file: file.to_string(),
    }
}

/// A minimal SARIF document with one finding at `uri`
pub fn sarif_with(driver: &str, uri: &str, line: i64) -> String {
    serde_json::json!({
        "version": "2.1.0",
        "runs": [{
            "tool": {"driver": {"name": driver}},
            "results": [{
                "ruleId": "R1",
                "level": "error",
                "message": {"text": "finding"},
                "locations": [{
                    "physicalLocation": {
                        "artifactLocation": {"uri": uri},
                        "region": {"startLine": line}
                    }
                }]
            }]
        }]
    })
    .to_string()
}
