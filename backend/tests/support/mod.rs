#![allow(dead_code)]

use async_trait::async_trait;
use common::model::student::StudentRecord;
use marksheet::error::{PipelineError, Result};
use marksheet::pipeline::contacts::ContactDirectory;
use marksheet::pipeline::notify::{DeliveryReceipt, Notifier};
use marksheet::pipeline::orchestrator::{Collaborators, Pipeline};
use marksheet::pipeline::publish::ArtifactPublisher;
use marksheet::pipeline::render::ReportRenderer;
use marksheet::pipeline::spreadsheet::SpreadsheetReader;
use marksheet::pipeline::text::artifact_stem;
use marksheet::pipeline::{PublishedLink, RenderedArtifact};
use rust_xlsxwriter::Workbook;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HEADER: [&str; 6] = [
    "Student Name",
    "Roll Number",
    "Class",
    "Maths",
    "Physics",
    "Chemistry",
];

/// Builds an `.xlsx` workbook with `HEADER` and one row per student.
pub fn workbook(rows: &[(&str, f64, [f64; 3])]) -> Vec<u8> {
    let mut book = Workbook::new();
    let sheet = book.add_worksheet();
    for (col, title) in HEADER.iter().enumerate() {
        sheet.write_string(0, col as u16, *title).unwrap();
    }
    for (i, (name, roll, marks)) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, *name).unwrap();
        sheet.write_number(r, 1, *roll).unwrap();
        sheet.write_string(r, 2, "III AI&DS").unwrap();
        for (j, mark) in marks.iter().enumerate() {
            sheet.write_number(r, (j + 3) as u16, *mark).unwrap();
        }
    }
    book.save_to_buffer().unwrap()
}

#[derive(Default)]
pub struct FakeDirectory {
    pub contacts: HashMap<String, String>,
    pub unreachable: HashSet<String>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeDirectory {
    pub fn with(contacts: &[(&str, &str)]) -> Self {
        Self {
            contacts: contacts
                .iter()
                .map(|(n, c)| (n.to_string(), c.to_string()))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContactDirectory for FakeDirectory {
    async fn resolve(&self, student_name: &str) -> Result<Option<String>> {
        self.lookups.lock().unwrap().push(student_name.to_string());
        if self.unreachable.contains(student_name) {
            return Err(PipelineError::Resolve("connection refused".into()));
        }
        Ok(self.contacts.get(student_name).cloned())
    }
}

/// Writes a small placeholder file per student instead of a PDF.
pub struct FakeRenderer {
    pub dir: PathBuf,
    pub fail_for: Option<String>,
    /// Blocks the render thread before writing.
    pub delay: Option<Duration>,
    pub rendered: Mutex<Vec<StudentRecord>>,
}

impl FakeRenderer {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fail_for: None,
            delay: None,
            rendered: Mutex::new(Vec::new()),
        }
    }
}

impl ReportRenderer for FakeRenderer {
    fn render(&self, record: &StudentRecord) -> Result<RenderedArtifact> {
        self.rendered.lock().unwrap().push(record.clone());
        if self.fail_for.as_deref() == Some(record.name.as_str()) {
            return Err(PipelineError::Render("logo asset is missing".into()));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let file_name = format!("{}.pdf", artifact_stem(&record.name, &record.roll_number));
        let path = self.dir.join(&file_name);
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        Ok(RenderedArtifact { file_name, path })
    }
}

#[derive(Default)]
pub struct FakePublisher {
    pub fail_for: Option<String>,
    pub published: Mutex<Vec<String>>,
}

#[async_trait]
impl ArtifactPublisher for FakePublisher {
    async fn publish(&self, artifact: &RenderedArtifact) -> Result<PublishedLink> {
        self.published.lock().unwrap().push(artifact.file_name.clone());
        if self.fail_for.as_deref() == Some(artifact.file_name.as_str()) {
            return Err(PipelineError::Publish("upload 507: insufficient_space".into()));
        }
        Ok(PublishedLink {
            url: format!("https://files.example/{}", artifact.file_name),
        })
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub fail_for: Option<String>,
    pub delay: Option<Duration>,
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, contact_address: &str, link_url: &str) -> Result<DeliveryReceipt> {
        self.sent
            .lock()
            .unwrap()
            .push((contact_address.to_string(), link_url.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_for.as_deref() == Some(contact_address) {
            return Err(PipelineError::Notify("HTTP 400 (code 63016): outside session".into()));
        }
        let n = self.sent.lock().unwrap().len();
        Ok(DeliveryReceipt {
            message_id: format!("SM{:032}", n),
            to: format!("whatsapp:{}", contact_address.trim()),
        })
    }
}

/// Fakes plus the pipeline wired to them.
pub struct Harness {
    pub contacts: Arc<FakeDirectory>,
    pub renderer: Arc<FakeRenderer>,
    pub publisher: Arc<FakePublisher>,
    pub notifier: Arc<FakeNotifier>,
    pub pipeline: Pipeline,
}

impl Harness {
    pub fn new(
        contacts: FakeDirectory,
        renderer: FakeRenderer,
        publisher: FakePublisher,
        notifier: FakeNotifier,
    ) -> Self {
        Self::with_options(contacts, renderer, publisher, notifier, Duration::from_secs(5), true)
    }

    pub fn with_options(
        contacts: FakeDirectory,
        renderer: FakeRenderer,
        publisher: FakePublisher,
        notifier: FakeNotifier,
        call_timeout: Duration,
        keep_artifacts: bool,
    ) -> Self {
        let contacts = Arc::new(contacts);
        let renderer = Arc::new(renderer);
        let publisher = Arc::new(publisher);
        let notifier = Arc::new(notifier);
        let pipeline = Pipeline::new(
            SpreadsheetReader::default(),
            Collaborators {
                contacts: contacts.clone(),
                renderer: renderer.clone(),
                publisher: publisher.clone(),
                notifier: notifier.clone(),
            },
            call_timeout,
            keep_artifacts,
        );
        Self {
            contacts,
            renderer,
            publisher,
            notifier,
            pipeline,
        }
    }

    pub fn render_count(&self) -> usize {
        self.renderer.rendered.lock().unwrap().len()
    }

    pub fn publish_count(&self) -> usize {
        self.publisher.published.lock().unwrap().len()
    }

    pub fn notify_count(&self) -> usize {
        self.notifier.sent.lock().unwrap().len()
    }
}
