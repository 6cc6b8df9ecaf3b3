//! # Folio CLI
//!
//! Usage:
//!   folio input.json -o area-tree.json
//!   echo '{ ... }' | folio --config layout.xml
//!   folio --example > report.json
//!
//! Diagnostics go to stderr through `RUST_LOG` (e.g. `RUST_LOG=folio=debug`).

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;

use folio::config::LayoutConfig;
use folio::layout::{LayoutEngine, Severity};
use folio::model::Document;
use folio::text::FixedPitchMeasurer;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_report_json());
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}

fn run(args: &[String]) -> folio::Result<()> {
    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1])?
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    };

    let output_path = flag_value(args, "-o");
    let document: Document = serde_json::from_str(&input)?;
    let config = match flag_value(args, "--config") {
        Some(path) => LayoutConfig::load(Path::new(&path))?,
        None => document.config.clone(),
    };

    let measurer = FixedPitchMeasurer {
        char_width: config.font.char_width,
    };
    let output = LayoutEngine::with_config(config).layout(&document, &measurer)?;
    let json = serde_json::to_string_pretty(&output)?;

    let errors = output
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    match output_path {
        Some(path) => {
            fs::write(&path, &json)?;
            eprintln!(
                "✓ Laid out {} pages to {} ({} diagnostics, {} errors)",
                output.area_tree.pages.len(),
                path,
                output.diagnostics.len(),
                errors
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
}

fn example_report_json() -> &'static str {
    r##"{
  "metadata": { "title": "Quarterly Report" },
  "defaultPage": {
    "size": { "Custom": { "width": 300, "height": 400 } },
    "margin": { "top": 36, "right": 36, "bottom": 36, "left": 36 },
    "headerExtent": 18,
    "footerExtent": 18
  },
  "children": [
    {
      "kind": { "type": "PageSequence", "config": null },
      "children": [
        {
          "kind": { "type": "StaticContent", "position": "Header" },
          "children": [
            {
              "kind": { "type": "Block" },
              "style": { "fontSize": 9 },
              "children": [
                { "kind": { "type": "RetrieveMarker", "className": "chapter" } }
              ]
            }
          ]
        },
        {
          "kind": { "type": "StaticContent", "position": "Footer" },
          "children": [
            {
              "kind": { "type": "Block" },
              "style": { "fontSize": 9, "textAlign": "Center" },
              "children": [
                { "kind": { "type": "Text", "content": "Page " } },
                { "kind": { "type": "PageNumber" } }
              ]
            }
          ]
        },
        {
          "kind": { "type": "Flow" },
          "children": [
            {
              "kind": { "type": "Block" },
              "style": { "fontSize": 16, "spaceAfter": 8, "keepWithNext": true },
              "bookmark": "",
              "children": [
                { "kind": { "type": "Marker", "className": "chapter" },
                  "children": [ { "kind": { "type": "Text", "content": "Summary" } } ] },
                { "kind": { "type": "Text", "content": "Summary" } }
              ]
            },
            {
              "kind": { "type": "Block" },
              "children": [
                { "kind": { "type": "Text", "content": "Revenue figures are on page " } },
                { "kind": { "type": "PageNumberCitation", "refId": "figures" } },
                { "kind": { "type": "Text", "content": ". Costs held steady through the quarter while demand for the new product line grew faster than the forecast." } }
              ]
            },
            { "kind": { "type": "PageBreak" } },
            {
              "kind": { "type": "Block" },
              "id": "figures",
              "style": { "fontSize": 16, "spaceAfter": 8 },
              "bookmark": "Figures",
              "children": [
                { "kind": { "type": "Marker", "className": "chapter" },
                  "children": [ { "kind": { "type": "Text", "content": "Figures" } } ] },
                { "kind": { "type": "Text", "content": "Figures" } }
              ]
            },
            {
              "kind": { "type": "Block" },
              "style": { "textDecoration": "Underline" },
              "children": [
                { "kind": { "type": "Text", "content": "Revenue rose eleven percent." } }
              ]
            }
          ]
        }
      ]
    }
  ]
}
"##
}
