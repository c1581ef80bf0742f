//! Scenario replay
//!
//! Builds a document from a TOML description of sheets, runs the sheet
//! runtime against it and records every [`SheetEvent`] step by step.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

use crate::config::Config;
use crate::core::{PanelSnapshot, SheetEvent};
use crate::dom::{Document, NodeId, SheetNodes, SheetTemplate};
use crate::runtime::{RuntimeHandle, SheetRuntime};
use crate::sheet::SheetController;

fn default_true() -> bool {
    true
}

/// One sheet in the scenario document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelSpec {
    pub name: String,
    /// Initial hidden marker on the container
    #[serde(default = "default_true")]
    pub hidden: bool,
    #[serde(default = "default_true")]
    pub backdrop: bool,
    #[serde(default = "default_true")]
    pub content: bool,
}

/// One scripted action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Dispatch the toggle event at the sheet container
    Toggle { panel: String },
    /// Dispatch animation-end at the sheet content
    AnimationEnd { panel: String },
    /// Let time pass (gate timeouts may fire)
    Wait { ms: u64 },
    Mount { panel: String },
    Unmount { panel: String },
}

impl Step {
    fn panel(&self) -> Option<&str> {
        match self {
            Self::Toggle { panel }
            | Self::AnimationEnd { panel }
            | Self::Mount { panel }
            | Self::Unmount { panel } => Some(panel),
            Self::Wait { .. } => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Toggle { panel } => format!("toggle {}", panel),
            Self::AnimationEnd { panel } => format!("animation_end {}", panel),
            Self::Wait { ms } => format!("wait {}ms", ms),
            Self::Mount { panel } => format!("mount {}", panel),
            Self::Unmount { panel } => format!("unmount {}", panel),
        }
    }
}

/// A replayable scenario file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Scenario {
    /// Overrides the loaded configuration when present
    #[serde(default)]
    pub config: Option<Config>,
    #[serde(default)]
    pub panels: Vec<PanelSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content).context("Invalid scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In scenario {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for panel in &self.panels {
            if !seen.insert(panel.name.as_str()) {
                bail!("Duplicate panel name: {}", panel.name);
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(name) = step.panel() {
                if !seen.contains(name) {
                    bail!("Step {} refers to unknown panel: {}", index + 1, name);
                }
            }
        }
        Ok(())
    }
}

/// Events observed while one step was processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTrace {
    pub step: usize,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub events: Vec<SheetEvent>,
}

/// Final state of one named sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelReport {
    pub name: String,
    pub panel: NodeId,
    /// `None` once the sheet is unmounted
    pub snapshot: Option<PanelSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub steps: Vec<StepTrace>,
    pub panels: Vec<PanelReport>,
    pub scroll_locked: bool,
}

/// Run `scenario` to completion on the sheet runtime
pub async fn replay(scenario: &Scenario, config: Config) -> Result<ReplayReport> {
    let config = scenario.config.clone().unwrap_or(config);

    let mut doc = Document::new();
    let body = doc.body();
    let mut sheets: Vec<(String, SheetNodes)> = Vec::with_capacity(scenario.panels.len());
    for spec in &scenario.panels {
        let nodes = SheetTemplate {
            hidden_class: &config.markers.hidden,
            backdrop_attr: &config.regions.backdrop_attr,
            content_attr: &config.regions.content_attr,
            hidden: spec.hidden,
            backdrop: spec.backdrop,
            content: spec.content,
        }
        .build(&mut doc, body);
        sheets.push((spec.name.clone(), nodes));
    }
    let by_name: HashMap<&str, SheetNodes> =
        sheets.iter().map(|(name, nodes)| (name.as_str(), *nodes)).collect();

    let mut controller = SheetController::new(doc, config);
    for (name, nodes) in &sheets {
        controller
            .mount(nodes.container)
            .with_context(|| format!("Failed to mount {}", name))?;
    }

    let (handle, task) = SheetRuntime::spawn(controller);
    let mut events = handle.subscribe();
    let mut traces = Vec::with_capacity(scenario.steps.len());

    for (index, step) in scenario.steps.iter().enumerate() {
        let note = run_step(&handle, step, &by_name).await?;
        handle.flush().await?;

        let mut observed = Vec::new();
        while let Ok(event) = events.try_recv() {
            observed.push(event);
        }
        tracing::debug!(step = index + 1, events = observed.len(), "Scenario step done");
        traces.push(StepTrace {
            step: index + 1,
            action: step.describe(),
            note,
            events: observed,
        });
    }

    let mut panels = Vec::with_capacity(sheets.len());
    for (name, nodes) in &sheets {
        panels.push(PanelReport {
            name: name.clone(),
            panel: nodes.container,
            snapshot: handle.snapshot(nodes.container).await?,
        });
    }

    handle.shutdown();
    let controller = task.await.context("Sheet runtime task failed")?;

    Ok(ReplayReport {
        steps: traces,
        panels,
        scroll_locked: controller.scroll_locked(),
    })
}

async fn run_step(
    handle: &RuntimeHandle,
    step: &Step,
    sheets: &HashMap<&str, SheetNodes>,
) -> Result<Option<String>> {
    let nodes = match step.panel() {
        Some(name) => sheets.get(name).copied(),
        None => None,
    };

    let note = match (step, nodes) {
        (Step::Toggle { .. }, Some(nodes)) => {
            let listeners = handle.toggle(nodes.container);
            (listeners == 0).then(|| "no listener attached".to_string())
        }
        (Step::AnimationEnd { .. }, Some(nodes)) => match nodes.content {
            Some(content) => {
                handle.animation_end(content);
                None
            }
            None => Some("sheet has no content region".to_string()),
        },
        (Step::Mount { .. }, Some(nodes)) => handle
            .mount(nodes.container)
            .await
            .err()
            .map(|err| err.to_string()),
        (Step::Unmount { .. }, Some(nodes)) => handle
            .unmount(nodes.container)
            .await
            .err()
            .map(|err| err.to_string()),
        (Step::Wait { ms }, _) => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            None
        }
        // validation guarantees every named panel exists
        (_, None) => bail!("Unknown panel in step: {}", step.describe()),
    };
    Ok(note)
}

// ========== Output ==========

fn event_line(event: &SheetEvent, names: &HashMap<NodeId, &str>) -> String {
    let name = |panel: &NodeId| names.get(panel).copied().unwrap_or("?").to_string();
    match event {
        SheetEvent::Opened { panel } => format!("opened {}", name(panel)),
        SheetEvent::CloseStarted { panel, generation } => {
            format!("close started {} (gate {})", name(panel), generation)
        }
        SheetEvent::Reopened { panel } => format!("reopened {}", name(panel)),
        SheetEvent::CloseRestarted { panel, generation } => {
            format!("close restarted {} (gate {})", name(panel), generation)
        }
        SheetEvent::Closed { panel, cause } => format!("closed {} ({:?})", name(panel), cause),
        SheetEvent::Rejected { panel, reason } => format!("rejected {}: {}", name(panel), reason),
        SheetEvent::ScrollLockChanged { locked } => {
            if *locked {
                "scroll locked".to_string()
            } else {
                "scroll unlocked".to_string()
            }
        }
    }
}

#[derive(Tabled)]
struct PanelRow {
    #[tabled(rename = "Panel")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Content")]
    content: String,
}

/// Human-readable rendering of a replay
pub fn render_text(report: &ReplayReport) -> String {
    let names: HashMap<NodeId, &str> = report
        .panels
        .iter()
        .map(|p| (p.panel, p.name.as_str()))
        .collect();

    let mut out = String::new();
    for trace in &report.steps {
        out.push_str(&format!(
            "{} {}\n",
            format!("[{}]", trace.step).dimmed(),
            trace.action.bold()
        ));
        if let Some(note) = &trace.note {
            out.push_str(&format!("    {}\n", note.yellow()));
        }
        for event in &trace.events {
            out.push_str(&format!("    {}\n", event_line(event, &names)));
        }
    }

    let rows: Vec<PanelRow> = report
        .panels
        .iter()
        .map(|p| match &p.snapshot {
            Some(s) => PanelRow {
                name: p.name.clone(),
                state: s.state.label().to_string(),
                container: s.container_markers.join(" "),
                content: s.content_markers.join(" "),
            },
            None => PanelRow {
                name: p.name.clone(),
                state: "unmounted".to_string(),
                container: String::new(),
                content: String::new(),
            },
        })
        .collect();

    out.push('\n');
    out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    out.push('\n');
    let lock = if report.scroll_locked {
        "locked".red()
    } else {
        "unlocked".green()
    };
    out.push_str(&format!("scroll lock: {}\n", lock));
    out
}
