//! `templates` - list the supported test templates

use serde::Serialize;
use zypin_selenium::{Plugin, SeleniumPlugin};
use zypin_selenium_common::TemplateKind;

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Serialize)]
struct TemplateInfo {
    id: &'static str,
    extensions: Vec<&'static str>,
    execution: &'static str,
}

impl From<TemplateKind> for TemplateInfo {
    fn from(kind: TemplateKind) -> Self {
        let execution = match kind {
            TemplateKind::BasicWebdriver => "node, one process per file",
            TemplateKind::CucumberBdd => "cucumber-js, one run for all features",
        };
        Self {
            id: kind.id(),
            extensions: kind.extensions().to_vec(),
            execution,
        }
    }
}

impl TableDisplay for TemplateInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Template", "Files", "Execution"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.extensions.join(", "),
            self.execution.to_string(),
        ]
    }
}

pub fn execute(plugin: &SeleniumPlugin, format: OutputFormat) {
    let templates: Vec<TemplateInfo> = plugin.metadata().templates.into_iter().map(TemplateInfo::from).collect();
    print_list(&templates, format);
}
