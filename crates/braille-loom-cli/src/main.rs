use anyhow::{Context, Result, ensure};
use braille_loom_config::Config;
use braille_loom_engine::{
    ElementKind, LayoutBuilder, MappedElement, PageGeometry, Section, SourceDocument,
    render_section_with,
};
use std::{env, fs, process};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();

    let args: Vec<String> = env::args().collect();
    let section_path = match args.len() {
        2 | 3 => args[1].clone(),
        _ => {
            eprintln!("Usage: {} <section.json> [profile]", args[0]);
            eprintln!(
                "Profiles come from the built-ins (letter, a4) or {}",
                Config::config_path().display()
            );
            process::exit(1);
        }
    };

    let mut config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => Config::default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    if let Some(profile) = args.get(2) {
        config.profile = profile.clone();
    }
    let profile = config.active_profile()?;
    let geometry = PageGeometry::new(profile.cells_per_line, profile.lines_per_page);
    log::info!(
        "rendering with profile '{}' ({}x{} cells)",
        profile.name,
        profile.cells_per_line,
        profile.lines_per_page
    );

    let content = fs::read_to_string(&section_path)
        .with_context(|| format!("failed to read section file '{section_path}'"))?;
    let section: Section = serde_json::from_str(&content)
        .with_context(|| format!("'{section_path}' is not a valid section"))?;
    check_source_ranges(
        &section.elements,
        SourceDocument::from_str(&section.source).len(),
    )?;

    let builder = match config.page_limit {
        Some(limit) => LayoutBuilder::with_page_limit(geometry, limit),
        None => LayoutBuilder::new(geometry),
    };
    let rendered = render_section_with(builder, section).context("failed to render section")?;

    let text: Vec<char> = rendered.snapshot.text.chars().collect();
    let pages = &rendered.snapshot.page_starts;
    for (number, page) in pages.iter().enumerate() {
        let end = pages.get(number + 1).map_or(text.len(), |next| next.offset);
        let body: String = text[page.offset..end].iter().collect();
        println!("---- page {} (node {}) ----", number + 1, page.node.0);
        println!("{}", body.strip_suffix('\n').unwrap_or(&body));
    }

    if !rendered.overlays.is_empty() {
        println!("---- overlays ----");
        for overlay in &rendered.overlays {
            println!("  @{:<6} {:?} {}", overlay.offset, overlay.kind, overlay.text);
        }
    }

    Ok(())
}

/// Reject source ranges past the section text before they reach the renderer.
fn check_source_ranges(elements: &[MappedElement], len: usize) -> Result<()> {
    for element in elements {
        ensure!(
            element.source_range.end <= len,
            "element node {} references source bytes {}..{} beyond section text of {len} bytes",
            element.node.0,
            element.source_range.start,
            element.source_range.end,
        );
        if let ElementKind::Table { cells } = &element.kind {
            check_source_ranges(cells, len)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use braille_loom_engine::{NodeId, TextKind};

    #[test]
    fn test_out_of_range_source_is_rejected() {
        let elements = vec![MappedElement::text(NodeId(1), TextKind::Plain, 0..9)];
        assert!(check_source_ranges(&elements, 9).is_ok());
        assert!(check_source_ranges(&elements, 5).is_err());
    }

    #[test]
    fn test_table_cells_are_checked_too() {
        let cell = MappedElement::text(NodeId(2), TextKind::Plain, 4..12);
        let elements = vec![MappedElement::table(NodeId(1), vec![cell])];
        assert!(check_source_ranges(&elements, 8).is_err());
    }
}
