//! Export an outline as a standalone HTML mind map.
//!
//! The tree is first reduced to a sanitized `{ content, children }` shape
//! (no ids, codes, or backend references), then embedded in a static page
//! that loads the markmap viewer from a CDN.

use crate::error::TreeError;
use crate::id::ElementId;
use crate::model::StructureTree;
use serde::{Deserialize, Serialize};

/// Sanitized node handed to the exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportNode {
    pub content: String,
    pub children: Vec<ExportNode>,
}

/// Configuration for `export_html`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Page title. Defaults to the root label when empty.
    pub title: String,
    /// Prefix labels with their WBS code, like the editor's toggle.
    pub show_wbs: bool,
    pub d3_url: String,
    pub markmap_lib_url: String,
    pub markmap_view_url: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            show_wbs: false,
            d3_url: "https://cdn.jsdelivr.net/npm/d3@7".into(),
            markmap_lib_url: "https://cdn.jsdelivr.net/npm/markmap-lib@0.15".into(),
            markmap_view_url: "https://cdn.jsdelivr.net/npm/markmap-view@0.15".into(),
        }
    }
}

/// Strip a tree down to labels and children.
pub fn sanitize(tree: &StructureTree, show_wbs: bool) -> Option<ExportNode> {
    let root = tree.root()?;
    Some(sanitize_node(tree, root, show_wbs, true))
}

fn sanitize_node(tree: &StructureTree, id: ElementId, show_wbs: bool, is_root: bool) -> ExportNode {
    let content = tree
        .get(id)
        .map(|el| {
            if show_wbs && !is_root {
                format!("{} - {}", el.wbs, el.content)
            } else {
                el.content.clone()
            }
        })
        .unwrap_or_default();
    ExportNode {
        content,
        children: tree
            .children(id)
            .into_iter()
            .map(|c| sanitize_node(tree, c, show_wbs, false))
            .collect(),
    }
}

/// Render the standalone HTML document.
pub fn export_html(tree: &StructureTree, config: &ExportConfig) -> Result<String, TreeError> {
    let data = sanitize(tree, config.show_wbs).ok_or(TreeError::EmptyTree)?;
    let title = if config.title.trim().is_empty() {
        data.content.clone()
    } else {
        config.title.clone()
    };
    let json = script_safe(&serde_json::to_string(&data)?);

    let mut html = String::with_capacity(1024 + json.len());
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&title)));
    html.push_str(
        "<style>\nhtml, body { margin: 0; padding: 0; height: 100%; }\n\
         #mindmap { display: block; width: 100vw; height: 100vh; }\n</style>\n",
    );
    html.push_str("</head>\n<body>\n<svg id=\"mindmap\"></svg>\n");
    for url in [&config.d3_url, &config.markmap_lib_url, &config.markmap_view_url] {
        html.push_str(&format!("<script src=\"{}\"></script>\n", escape_html(url)));
    }
    html.push_str("<script>\n");
    html.push_str(&format!("const data = {json};\n"));
    html.push_str(
        "function toMarkmap(node) {\n  \
         return { content: node.content, children: (node.children || []).map(toMarkmap) };\n}\n\
         window.markmap.Markmap.create('#mindmap', null, toMarkmap(data));\n",
    );
    html.push_str("</script>\n</body>\n</html>\n");
    Ok(html)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Keep embedded JSON from closing the surrounding `<script>` element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/").replace("<!--", "<\\!--")
}
