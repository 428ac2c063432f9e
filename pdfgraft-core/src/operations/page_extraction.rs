//! Page closure computation
//!
//! A page's closure is every object reachable from its effective dictionary,
//! except for the `Parent` links that lead back up the page tree. Copying the
//! closure is enough to reproduce the page in another document.

use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use indexmap::IndexSet;

/// A page and everything it depends on
#[derive(Debug, Clone, PartialEq)]
pub struct PageClosure {
    /// The page object in the source document
    pub page: ObjectId,
    /// The effective page dictionary (inherited attributes included),
    /// without its `Parent` entry
    pub page_dict: Dictionary,
    /// Reachable identities in discovery order, the page first
    pub objects: IndexSet<ObjectId>,
    /// References met on the way that do not resolve
    pub missing: Vec<ObjectId>,
}

impl PageClosure {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains(&id)
    }
}

/// Computes the closure of the page at 0-based `page_index`.
pub fn closure(document: &mut Document, page_index: usize) -> Result<PageClosure> {
    let page = document
        .page(page_index)
        .ok_or(PdfError::PageIndexOutOfBounds(page_index, document.page_count()))?;
    let page_id = page.id();
    let mut page_dict = page.dictionary().clone();
    page_dict.remove("Parent");

    let mut objects = IndexSet::new();
    let mut missing = Vec::new();
    objects.insert(page_id);

    // Work list of identities still to expand
    let mut pending: Vec<ObjectId> = Object::Dictionary(page_dict.clone())
        .references()
        .into_iter()
        .rev()
        .collect();

    while let Some(id) = pending.pop() {
        if objects.contains(&id) {
            continue;
        }
        let Some(object) = document.get_object(id)? else {
            if !missing.contains(&id) {
                tracing::debug!("Page {} depends on missing object {}", page_id, id);
                missing.push(id);
            }
            continue;
        };
        objects.insert(id);

        let children = match object {
            Object::Dictionary(dict) => dict_references(dict),
            Object::Stream(stream) => dict_references(stream.dictionary()),
            other => other.references(),
        };
        pending.extend(children.into_iter().rev().filter(|c| !objects.contains(c)));
    }

    Ok(PageClosure {
        page: page_id,
        page_dict,
        objects,
        missing,
    })
}

/// References of a dictionary, skipping `Parent` on page-tree nodes
fn dict_references(dict: &Dictionary) -> Vec<ObjectId> {
    let skip_parent = dict.is_page_tree_node();
    dict.iter()
        .filter(|(key, _)| !(skip_parent && key.as_str() == "Parent"))
        .flat_map(|(_, value)| value.references())
        .collect()
}
