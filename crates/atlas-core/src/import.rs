//! Hydrate outline trees from backend payloads and raw JSON.
//!
//! The backend returns a structure with a nested `elements` array. The raw
//! editor box uses the same element shape for a single root. Both paths
//! sort siblings by their explicit `order` and renumber.

use crate::error::TreeError;
use crate::id::ElementId;
use crate::model::{Color, Element, ElementRefs, StructureTree};
use crate::wbs::WbsCode;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Deserializer, Serialize};

/// `GET structure(id)` response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructurePayload {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub elements: Vec<ElementPayload>,
    #[serde(default)]
    pub markmap_show_wbs: bool,
}

/// One element of the hierarchical payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ElementId>,
    #[serde(alias = "name", alias = "originalContent")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wbs: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub wbs_pinned: bool,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ElementId>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub structure_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Num(i64),
}

impl From<StringOrNumber> for String {
    fn from(raw: StringOrNumber) -> Self {
        match raw {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Num(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(d).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(d)?.map(String::from))
}

// ─── Hydration ───────────────────────────────────────────────────────────

/// How `hydrate_with` picks the root of a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootPolicy {
    /// A single top-level element is the root; anything else gets the
    /// synthetic structure root.
    #[default]
    Auto,
    /// Always hang top-level elements under the synthetic structure root.
    Synthetic,
}

impl RootPolicy {
    /// The policy that keeps `tree`'s root kind when it is rebuilt from a
    /// newer payload of the same structure.
    pub fn keeping(tree: &StructureTree, structure_id: &str) -> Self {
        if tree.root() == Some(synthetic_root_id(structure_id)) {
            RootPolicy::Synthetic
        } else {
            RootPolicy::Auto
        }
    }
}

/// Build the editor tree for a structure.
///
/// A single top-level element becomes the root. Several top-level elements
/// (or none) hang under a synthetic root `structure_<id>` labelled with the
/// structure name. A structure with no name and no elements is empty.
pub fn hydrate(payload: &StructurePayload) -> Result<StructureTree, TreeError> {
    hydrate_with(payload, RootPolicy::Auto)
}

/// `hydrate` with an explicit root policy. Once a structure is shown under
/// its synthetic root, later payloads must keep it there even when the
/// element count drops to one.
pub fn hydrate_with(payload: &StructurePayload, policy: RootPolicy) -> Result<StructureTree, TreeError> {
    let structure_id = Some(payload.id.clone());
    let mut tree = StructureTree::new();

    match (policy, payload.elements.as_slice()) {
        (RootPolicy::Auto, []) if payload.name.trim().is_empty() => return Ok(tree),
        (RootPolicy::Auto, [single]) => {
            let root = tree.set_root(to_element(single, structure_id.clone(), None)?);
            add_children(&mut tree, root, &single.children, &structure_id)?;
        }
        (_, many) => {
            let id = synthetic_root_id(&payload.id);
            let mut root = Element::new(id, payload.name.clone());
            root.refs.structure_id = structure_id.clone();
            let root = tree.set_root(root);
            add_children(&mut tree, root, many, &structure_id)?;
        }
    }

    tree.sort_by_order();
    tree.renumber();
    log::debug!("hydrated structure {} with {} elements", payload.id, tree.len());
    Ok(tree)
}

/// Id of the unpersisted root that groups several top-level elements.
pub fn synthetic_root_id(structure_id: &str) -> ElementId {
    ElementId::intern(&format!("structure_{structure_id}"))
}

/// Parse the raw-edit JSON (a single root element with nested children).
pub fn parse_raw_tree(text: &str) -> Result<StructureTree, TreeError> {
    let payload: ElementPayload = serde_json::from_str(text)?;
    let mut tree = StructureTree::new();
    let root = tree.set_root(to_element(&payload, None, None)?);
    add_children(&mut tree, root, &payload.children, &None)?;
    tree.sort_by_order();
    tree.renumber();
    Ok(tree)
}

/// Serialize a tree into the raw-edit JSON shape.
pub fn to_raw_json(tree: &StructureTree) -> Result<String, TreeError> {
    let Some(root) = tree.root() else {
        return Err(TreeError::EmptyTree);
    };
    Ok(serde_json::to_string_pretty(&to_payload(tree, root))?)
}

fn to_payload(tree: &StructureTree, id: ElementId) -> ElementPayload {
    let el = tree.get(id);
    ElementPayload {
        id: el.map(Element::persisted_id).or(Some(id)),
        content: el.map(|e| e.content.clone()).unwrap_or_default(),
        children: tree
            .children(id)
            .into_iter()
            .map(|c| to_payload(tree, c))
            .collect(),
        order: el.and_then(|e| e.order),
        wbs: el.filter(|e| e.wbs_pinned).map(|e| e.wbs.clone()),
        wbs_pinned: el.is_some_and(|e| e.wbs_pinned),
        record_id: el.and_then(|e| e.refs.record_id.clone()),
        parent_id: None,
        structure_id: el.and_then(|e| e.refs.structure_id.clone()),
        color: el.and_then(|e| e.color).map(|c| c.to_hex()),
    }
}

fn add_children(
    tree: &mut StructureTree,
    parent: NodeIndex,
    children: &[ElementPayload],
    structure_id: &Option<String>,
) -> Result<(), TreeError> {
    for child in children {
        let parent_ref = tree.node(parent).refs.element_id;
        let element = to_element(child, structure_id.clone(), parent_ref)?;
        if tree.contains(element.id) {
            return Err(TreeError::DuplicateId(element.id));
        }
        let idx = tree.add_child(parent, element);
        add_children(tree, idx, &child.children, structure_id)?;
    }
    Ok(())
}

fn to_element(
    payload: &ElementPayload,
    structure_id: Option<String>,
    parent_ref: Option<ElementId>,
) -> Result<Element, TreeError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(TreeError::EmptyName);
    }
    let id = payload.id.unwrap_or_else(ElementId::local);
    let mut el = Element::new(id, content);
    el.order = payload.order;
    el.refs = ElementRefs {
        structure_id: payload.structure_id.clone().or(structure_id),
        parent_id: payload.parent_id.or(parent_ref),
        record_id: payload.record_id.clone(),
        element_id: (!id.is_local()).then_some(id),
    };
    if payload.wbs_pinned
        && let Some(code) = &payload.wbs
    {
        el.wbs = WbsCode::parse(code)?.to_string();
        el.wbs_pinned = true;
    }
    el.color = payload.color.as_deref().and_then(Color::from_hex);
    Ok(el)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    #[test]
    fn single_top_level_element_is_the_root() {
        let payload: StructurePayload = serde_json::from_str(
            r#"{
                "id": 7,
                "name": "Plan",
                "markmapShowWbs": true,
                "elements": [{
                    "id": 100,
                    "name": "Plan",
                    "children": [
                        {"id": 102, "name": "Second", "order": 2},
                        {"id": 101, "name": "First", "order": 1, "recordId": 55}
                    ]
                }]
            }"#,
        )
        .unwrap();
        assert!(payload.markmap_show_wbs);

        let tree = hydrate(&payload).unwrap();
        assert_eq!(tree.root(), Some(id("100")));
        assert_eq!(tree.children(id("100")), vec![id("101"), id("102")]);
        let first = tree.get(id("101")).unwrap();
        assert_eq!(first.wbs, "1.1");
        assert_eq!(first.refs.record_id.as_deref(), Some("55"));
        assert_eq!(first.refs.structure_id.as_deref(), Some("7"));
        assert_eq!(first.refs.parent_id, Some(id("100")));
        assert_eq!(first.refs.element_id, Some(id("101")));
    }

    #[test]
    fn several_top_level_elements_get_a_synthetic_root() {
        let payload = StructurePayload {
            id: "9".into(),
            name: "Roadmap".into(),
            elements: vec![
                ElementPayload {
                    id: Some(id("h_1")),
                    content: "Q1".into(),
                    ..Default::default()
                },
                ElementPayload {
                    id: Some(id("h_2")),
                    content: "Q2".into(),
                    ..Default::default()
                },
            ],
            markmap_show_wbs: false,
        };
        let tree = hydrate(&payload).unwrap();
        let root = tree.root_element().unwrap();
        assert_eq!(root.id, id("structure_9"));
        assert_eq!(root.content, "Roadmap");
        assert_eq!(tree.get(id("h_2")).unwrap().wbs, "1.2");
    }

    #[test]
    fn nameless_empty_structure_is_empty() {
        let tree = hydrate(&StructurePayload::default()).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let text = r#"{"id": "d_1", "content": "R", "children": [
            {"id": "d_2", "content": "x"}, {"id": "d_2", "content": "y"}]}"#;
        assert_eq!(parse_raw_tree(text), Err(TreeError::DuplicateId(id("d_2"))));
    }

    #[test]
    fn malformed_raw_json_is_a_parse_error() {
        let err = parse_raw_tree(r#"{"content": "Root", "children": [ }"#).unwrap_err();
        assert!(matches!(err, TreeError::Parse(_)));
    }

    #[test]
    fn raw_json_roundtrip_keeps_shape() {
        let text = r##"{"id": "r_root", "content": "Root", "children": [
            {"id": "r_a", "content": "A", "wbs": "4.2", "wbsPinned": true,
             "children": [{"content": "A child"}]},
            {"id": "r_b", "content": "B", "color": "#FF0000"}]}"##;
        let tree = parse_raw_tree(text).unwrap();
        assert_eq!(tree.get(id("r_a")).unwrap().wbs, "4.2");
        let child = tree.children(id("r_a"))[0];
        assert!(child.is_local());
        assert_eq!(tree.get(child).unwrap().wbs, "4.2.1");

        let again = parse_raw_tree(&to_raw_json(&tree).unwrap()).unwrap();
        assert_eq!(again, tree);
    }

    fn two_quarters() -> StructurePayload {
        serde_json::from_str(
            r#"{"id": "s4", "name": "Year", "elements": [
                {"id": "k_q1", "name": "Q1", "order": 1},
                {"id": "k_q2", "name": "Q2", "order": 2}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn synthetic_root_survives_dropping_to_one_element() {
        let before = hydrate(&two_quarters()).unwrap();
        assert_eq!(before.root(), Some(id("structure_s4")));

        let mut after = two_quarters();
        after.elements.pop();
        let policy = RootPolicy::keeping(&before, "s4");
        assert_eq!(policy, RootPolicy::Synthetic);

        let tree = hydrate_with(&after, policy).unwrap();
        assert_eq!(tree.root(), Some(id("structure_s4")));
        let q1 = tree.get(id("k_q1")).unwrap();
        assert_eq!((q1.wbs.as_str(), q1.level), ("1.1", 1));
        assert_eq!(tree.root_element().unwrap().content, "Year");

        // Without the policy a lone element would take over the root.
        assert_eq!(hydrate(&after).unwrap().root(), Some(id("k_q1")));
    }

    #[test]
    fn element_root_is_kept_by_auto_policy() {
        let tree = parse_raw_tree(r#"{"id": "k_only", "content": "Only"}"#).unwrap();
        assert_eq!(RootPolicy::keeping(&tree, "s4"), RootPolicy::Auto);
    }

    #[test]
    fn raw_json_keeps_server_ids_and_order() {
        let payload: StructurePayload = serde_json::from_str(
            r#"{"id": 12, "name": "Site", "elements": [{"id": "w_root", "name": "Site",
                "children": [{"id": "w_b", "name": "B", "order": 5},
                             {"id": "w_a", "name": "A", "order": 3}]}]}"#,
        )
        .unwrap();
        let tree = hydrate(&payload).unwrap();
        let fresh = Element::local("Fresh");
        let local = fresh.id;
        let tree = tree
            .insert_under(id("w_a"), fresh)
            .unwrap()
            .set_element_id(local, id("srv_31"))
            .unwrap();

        let again = parse_raw_tree(&to_raw_json(&tree).unwrap()).unwrap();
        assert!(!again.contains(local));
        let confirmed = again.get(id("srv_31")).unwrap();
        assert_eq!(confirmed.refs.element_id, Some(id("srv_31")));
        assert_eq!(confirmed.refs.parent_id, Some(id("w_a")));
        assert_eq!(confirmed.refs.structure_id.as_deref(), Some("12"));
        assert_eq!(again.children(id("w_root")), vec![id("w_a"), id("w_b")]);
        assert_eq!(again.get(id("w_b")).unwrap().order, Some(5));
    }

    #[test]
    fn reparented_element_stays_last_after_raw_roundtrip() {
        let text = r#"{"id": "m_root", "content": "R", "children": [
            {"id": "m_a", "content": "A", "order": 1},
            {"id": "m_b", "content": "B", "order": 2,
             "children": [{"id": "m_b1", "content": "B1", "order": 7}]}]}"#;
        let tree = parse_raw_tree(text).unwrap().reparent(id("m_a"), id("m_b")).unwrap();
        assert_eq!(tree.children(id("m_b")), vec![id("m_b1"), id("m_a")]);

        let again = parse_raw_tree(&to_raw_json(&tree).unwrap()).unwrap();
        assert_eq!(again.children(id("m_b")), vec![id("m_b1"), id("m_a")]);
        assert_eq!(again, tree);
    }
}
