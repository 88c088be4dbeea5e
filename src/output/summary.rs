use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::report::{RunReport, RunWarning, WarningKind};

use super::styling::{accent, dim, failure, heading, ok, pending};
use super::tables::{color_coded_saved_cell, create_cyan_header, create_table};

const MAX_PROJECT_ROWS: usize = 20;

/// Prints a human-readable summary of a collection run to stderr.
///
/// Shows an overview, the projects that contributed deployments (busiest
/// first) and every warning recorded during the run.
pub fn print_summary(report: &RunReport) {
    eprintln!("{}", render_summary(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{emoji} {}", heading(title));
}

fn warning_kind_label(kind: WarningKind) -> &'static str {
    match kind {
        WarningKind::DeploymentFetch => "fetch deployments",
        WarningKind::ProjectSave => "save project",
        WarningKind::DeploymentSave => "save deployment",
    }
}

fn warning_subject(warning: &RunWarning) -> String {
    match (warning.project_id, warning.deployment_id) {
        (Some(project), Some(deployment)) => format!("project {project} / deployment {deployment}"),
        (Some(project), None) => format!("project {project}"),
        _ => "all projects".to_string(),
    }
}

fn render_summary(report: &RunReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let warnings_display = if report.has_warnings() {
        failure(report.warnings.len())
    } else {
        ok(0)
    };

    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Source:"),
        accent(&report.source),
        dim("Projects collected:"),
        pending(report.total_projects),
        dim("Deployments saved:"),
        pending(report.total_deployments_saved),
        dim("Warnings:"),
        warnings_display,
        dim("Run started:"),
        dim(report.started_at.format("%Y-%m-%d %H:%M UTC"))
    );

    let mut active: Vec<_> = report
        .projects
        .iter()
        .filter(|p| p.deployments_fetched > 0)
        .collect();

    if active.is_empty() {
        let _ = writeln!(output, "{}", pending("No production deployments found."));
    } else {
        active.sort_by(|a, b| b.deployments_retained.cmp(&a.deployments_retained));

        add_section_header(&mut output, "🚀", "Projects");

        let mut table = create_table();
        table.set_header(create_cyan_header(&[
            "Project",
            "Fetched",
            "Retained",
            "Saved",
        ]));

        for project in active.iter().take(MAX_PROJECT_ROWS) {
            table.add_row(vec![
                Cell::new(&project.path_with_namespace),
                Cell::new(project.deployments_fetched),
                Cell::new(project.deployments_retained),
                color_coded_saved_cell(project.deployments_saved, project.deployments_retained),
            ]);
        }

        if active.len() > MAX_PROJECT_ROWS {
            table.add_row(vec![
                Cell::new(format!("... and {} more", active.len() - MAX_PROJECT_ROWS))
                    .fg(TableColor::DarkGrey),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ]);
        }

        let _ = writeln!(output, "{table}\n");
    }

    if report.has_warnings() {
        add_section_header(&mut output, "⚠️", "Warnings");

        let mut table = create_table();
        table.set_header(create_cyan_header(&["Failed to", "Subject", "Error"]));

        for warning in &report.warnings {
            table.add_row(vec![
                Cell::new(warning_kind_label(warning.kind)).fg(TableColor::Red),
                Cell::new(warning_subject(warning)),
                Cell::new(&warning.message),
            ]);
        }

        let _ = writeln!(output, "{table}");
    }

    output
}
