//! Page tree traversal
//!
//! Walks the page tree (ISO 32000-1 Section 7.7.3) depth-first and produces
//! the document's pages in reading order. Each page carries its effective
//! dictionary: its own entries plus the inheritable attributes found on its
//! ancestors.

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::HashSet;

/// Attributes a page inherits from its ancestor `Pages` nodes
pub const INHERITABLE_ATTRIBUTES: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// A page reachable from the page tree
#[derive(Debug, Clone, PartialEq)]
pub struct PageNode {
    id: ObjectId,
    dict: Dictionary,
}

impl PageNode {
    pub fn new(id: ObjectId, dict: Dictionary) -> Self {
        Self { id, dict }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The effective page dictionary, inherited attributes included
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// References to the page's content streams, in drawing order
    pub fn contents(&self) -> Vec<ObjectId> {
        match self.dict.get("Contents") {
            Some(Object::Reference(id)) => vec![*id],
            Some(Object::Array(items)) => items.iter().filter_map(|obj| obj.as_reference()).collect(),
            _ => Vec::new(),
        }
    }

    /// The `Resources` entry (a dictionary or a reference to one)
    pub fn resources(&self) -> Option<&Object> {
        self.dict.get("Resources")
    }

    /// The media box as `[llx, lly, urx, ury]` when it is stored directly
    pub fn media_box(&self) -> Option<[f64; 4]> {
        let values = self.dict.get("MediaBox")?.as_array()?;
        if values.len() != 4 {
            return None;
        }
        let mut rect = [0.0; 4];
        for (slot, value) in rect.iter_mut().zip(values) {
            *slot = value.as_real()?;
        }
        Some(rect)
    }
}

/// Walk the tree below `root`, loading nodes through `load`.
///
/// A `Pages` node reached twice means the tree has a cycle and is an error.
/// Kids that do not resolve, or resolve to something other than a
/// dictionary, are skipped.
pub fn walk_page_tree<F>(root: ObjectId, mut load: F) -> ParseResult<Vec<PageNode>>
where
    F: FnMut(ObjectId) -> ParseResult<Option<Object>>,
{
    let mut pages = Vec::new();
    let mut visited = HashSet::new();
    // Work list of (node, inherited attributes); popped from the back
    let mut stack = vec![(root, Dictionary::new())];

    while let Some((id, inherited)) = stack.pop() {
        let dict = match load(id)? {
            Some(Object::Dictionary(dict)) => dict,
            Some(Object::Stream(stream)) => stream.dictionary().clone(),
            Some(other) => {
                tracing::warn!("Page tree node {} is a {}, skipping", id, other.type_name());
                continue;
            }
            None => {
                tracing::warn!("Page tree node {} does not exist, skipping", id);
                continue;
            }
        };

        if is_pages_node(&dict) {
            if !visited.insert(id) {
                return Err(ParseError::CircularReference(format!(
                    "page tree node {id} is reached twice"
                )));
            }

            let mut inherited = inherited;
            for key in INHERITABLE_ATTRIBUTES {
                if let Some(value) = dict.get(key) {
                    inherited.set(key, value.clone());
                }
            }

            let kids: Vec<ObjectId> = match dict.get("Kids") {
                Some(Object::Array(kids)) => kids.iter().filter_map(|k| k.as_reference()).collect(),
                _ => Vec::new(),
            };
            // Reverse so the first kid is popped first
            for kid in kids.into_iter().rev() {
                stack.push((kid, inherited.clone()));
            }
        } else {
            if !visited.insert(id) {
                tracing::warn!("Page {} appears twice in the page tree, keeping the first", id);
                continue;
            }

            let mut effective = dict;
            for (key, value) in inherited {
                if !effective.contains_key(&key) {
                    effective.set(key, value);
                }
            }
            pages.push(PageNode::new(id, effective));
        }
    }

    Ok(pages)
}

/// `/Type /Pages`, or an untyped node that has `Kids`
fn is_pages_node(dict: &Dictionary) -> bool {
    match dict.get_type() {
        Some("Pages") => true,
        Some(_) => false,
        None => dict.contains_key("Kids"),
    }
}
