//! Copying page closures between documents
//!
//! Objects are copied in two passes. The allocation pass gives every object
//! not copied before a fresh identity in the destination; the content pass
//! clones the payloads with their references rewritten through the
//! [`CopyMap`]. Cycles need no special care because every identity is known
//! before any payload is rewritten.

use super::page_extraction::PageClosure;
use crate::document::Document;
use crate::error::{Diagnostic, ReferenceError, Result};
use crate::objects::{Object, ObjectId};
use std::collections::HashMap;

/// Index of a source document within one operation
pub type SourceId = usize;

/// Source identity to destination identity, per source document.
///
/// One map lives exactly as long as the operation that created it.
#[derive(Debug, Default, Clone)]
pub struct CopyMap {
    map: HashMap<(SourceId, ObjectId), ObjectId>,
}

impl CopyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: SourceId, id: ObjectId) -> Option<ObjectId> {
        self.map.get(&(source, id)).copied()
    }

    pub fn insert(&mut self, source: SourceId, id: ObjectId, dest: ObjectId) {
        self.map.insert((source, id), dest);
    }

    pub fn contains(&self, source: SourceId, id: ObjectId) -> bool {
        self.map.contains_key(&(source, id))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Copies `closure` from `source` into `dest` and returns the identity of
/// the new page object. The page is not attached to the page tree.
///
/// Objects `copy_map` already holds for `source_id` are reused, except the
/// annotations listed in the page's own `/Annots`: a page copied again gets
/// its own annotation objects, so every `/P` names the page holding it.
/// References that do not resolve become `null` and are reported in
/// `diagnostics`.
pub fn merge_closure(
    source: &mut Document,
    source_id: SourceId,
    closure: &PageClosure,
    dest: &mut Document,
    copy_map: &mut CopyMap,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<ObjectId> {
    // Allocation pass
    let page_copy = dest.new_object_id();
    if !copy_map.contains(source_id, closure.page) {
        copy_map.insert(source_id, closure.page, page_copy);
    }

    // Identities owned by this copy of the page, ahead of the copy map
    let mut local = HashMap::from([(closure.page, page_copy)]);
    let mut fresh = Vec::new();
    for id in annotation_objects(source, closure)? {
        if copy_map.contains(source_id, id) && !local.contains_key(&id) {
            let dest_id = dest.new_object_id();
            local.insert(id, dest_id);
            fresh.push((id, dest_id));
        }
    }

    for &id in closure.objects.iter().skip(1) {
        if !copy_map.contains(source_id, id) {
            let dest_id = dest.new_object_id();
            copy_map.insert(source_id, id, dest_id);
            fresh.push((id, dest_id));
        }
    }

    // Content pass
    let lookup = |target: ObjectId| {
        local
            .get(&target)
            .copied()
            .or_else(|| copy_map.get(source_id, target))
    };

    let mut page = Object::Dictionary(closure.page_dict.clone());
    rewrite(&mut page, closure.page, &lookup, diagnostics);
    dest.set_object(page_copy, page);

    for (id, dest_id) in fresh {
        let Some(object) = source.get_object(id)? else {
            dest.set_object(dest_id, Object::Null);
            continue;
        };
        let mut object = object.clone();
        if let Object::Dictionary(dict) = &mut object {
            if dict.is_page_tree_node() {
                dict.remove("Parent");
            }
        }
        rewrite(&mut object, id, &lookup, diagnostics);
        dest.set_object(dest_id, object);
    }

    tracing::debug!(
        "Copied page {} of source {} as {} ({} objects in closure, {} annotation objects re-allocated)",
        closure.page,
        source_id,
        page_copy,
        closure.len(),
        local.len() - 1
    );
    Ok(page_copy)
}

/// The `/Annots` array of the page (when indirect) and the annotations it
/// lists, limited to objects present in the closure
fn annotation_objects(source: &mut Document, closure: &PageClosure) -> Result<Vec<ObjectId>> {
    let mut owned = Vec::new();
    let annots = match closure.page_dict.get("Annots") {
        Some(Object::Reference(id)) => {
            owned.push(*id);
            match source.get_object(*id)? {
                Some(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            }
        }
        Some(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    owned.extend(annots.iter().filter_map(Object::as_reference));
    owned.retain(|id| *id != closure.page && closure.objects.contains(id));
    Ok(owned)
}

fn rewrite(
    object: &mut Object,
    referrer: ObjectId,
    lookup: &impl Fn(ObjectId) -> Option<ObjectId>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    object.rewrite_references(&mut |target| match lookup(target) {
        Some(dest) => Object::Reference(dest),
        None => {
            tracing::warn!(
                "Object {} references missing object {}, writing null",
                referrer,
                target
            );
            diagnostics.push(ReferenceError { referrer, target }.into());
            Object::Null
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Dictionary, Stream};
    use crate::operations::page_extraction::closure;
    use pretty_assertions::assert_eq;

    fn source_document() -> Document {
        let mut doc = Document::new();
        let image = doc.add_object(Stream::new(vec![0u8; 16]));
        let mut xobjects = Dictionary::new();
        xobjects.set("Im1", image);
        let mut resources = Dictionary::new();
        resources.set("XObject", xobjects);
        let resources = doc.add_object(resources);

        for _ in 0..2 {
            let content = doc.add_object(Stream::new(b"q /Im1 Do Q".to_vec()));
            let mut page = Dictionary::new();
            page.set("Type", Object::name("Page"));
            page.set("Resources", resources);
            page.set("Contents", content);
            let page = doc.add_object(page);
            doc.append_page(page).unwrap();
        }
        doc
    }

    fn copy_page(
        source: &mut Document,
        index: usize,
        dest: &mut Document,
        copy_map: &mut CopyMap,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ObjectId {
        let closure = closure(source, index).unwrap();
        let page = merge_closure(source, 0, &closure, dest, copy_map, diagnostics).unwrap();
        dest.append_page(page).unwrap();
        page
    }

    fn resources_of(dest: &mut Document, page: ObjectId) -> Object {
        let dict = dest.get_object(page).unwrap().unwrap().as_dict().unwrap();
        dict.get("Resources").unwrap().clone()
    }

    #[test]
    fn test_shared_resources_are_copied_once() {
        let mut source = source_document();
        let mut dest = Document::new();
        let mut copy_map = CopyMap::new();
        let mut diagnostics = Vec::new();

        let first = copy_page(&mut source, 0, &mut dest, &mut copy_map, &mut diagnostics);
        let second = copy_page(&mut source, 1, &mut dest, &mut copy_map, &mut diagnostics);

        assert_ne!(first, second);
        assert_eq!(resources_of(&mut dest, first), resources_of(&mut dest, second));
        // page + resources + image + content, then page + content
        assert_eq!(copy_map.len(), 6);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_same_page_twice_gives_two_page_objects() {
        let mut source = source_document();
        let mut dest = Document::new();
        let mut copy_map = CopyMap::new();
        let mut diagnostics = Vec::new();

        let first = copy_page(&mut source, 0, &mut dest, &mut copy_map, &mut diagnostics);
        let again = copy_page(&mut source, 0, &mut dest, &mut copy_map, &mut diagnostics);

        assert_ne!(first, again);
        assert_eq!(dest.page_count(), 2);
        assert_eq!(resources_of(&mut dest, first), resources_of(&mut dest, again));
    }

    #[test]
    fn test_copied_page_points_at_destination_tree() {
        let mut source = source_document();
        let mut dest = Document::new();
        let page = copy_page(
            &mut source,
            1,
            &mut dest,
            &mut CopyMap::new(),
            &mut Vec::new(),
        );

        let dict = dest.get_object(page).unwrap().unwrap().as_dict().unwrap().clone();
        let parent = dict.get("Parent").and_then(|p| p.as_reference()).unwrap();
        let parent = dest.get_object(parent).unwrap().unwrap().as_dict().unwrap();
        assert_eq!(parent.get_type(), Some("Pages"));
    }

    fn annotations_of(dest: &mut Document, page: ObjectId) -> Vec<ObjectId> {
        let dict = dest.get_object(page).unwrap().unwrap().as_dict().unwrap();
        dict.get("Annots")
            .and_then(|a| a.as_array())
            .unwrap()
            .iter()
            .map(|a| a.as_reference().unwrap())
            .collect()
    }

    #[test]
    fn test_repeated_page_gets_its_own_annotations() {
        let mut source = Document::new();
        let page = source.new_object_id();
        let appearance = source.add_object(Stream::new(b"0 0 1 rg".to_vec()));
        let mut ap = Dictionary::new();
        ap.set("N", appearance);
        let mut note = Dictionary::new();
        note.set("Type", Object::name("Annot"));
        note.set("Subtype", Object::name("Text"));
        note.set("P", page);
        note.set("AP", ap);
        let note = source.add_object(note);
        let mut popup = Dictionary::new();
        popup.set("Type", Object::name("Annot"));
        popup.set("Subtype", Object::name("Popup"));
        popup.set("Parent", note);
        popup.set("P", page);
        let popup = source.add_object(popup);
        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::name("Page"));
        page_dict.set("Annots", vec![Object::Reference(note), Object::Reference(popup)]);
        source.set_object(page, page_dict);
        source.append_page(page).unwrap();

        let mut dest = Document::new();
        let mut copy_map = CopyMap::new();
        let mut diagnostics = Vec::new();
        let first = copy_page(&mut source, 0, &mut dest, &mut copy_map, &mut diagnostics);
        let again = copy_page(&mut source, 0, &mut dest, &mut copy_map, &mut diagnostics);
        assert!(diagnostics.is_empty());

        let first_annots = annotations_of(&mut dest, first);
        let again_annots = annotations_of(&mut dest, again);
        assert_eq!(first_annots.len(), 2);
        assert_eq!(again_annots.len(), 2);
        assert!(first_annots.iter().all(|id| !again_annots.contains(id)));

        let mut appearances = Vec::new();
        for (page, annots) in [(first, &first_annots), (again, &again_annots)] {
            let note = dest.get_object(annots[0]).unwrap().unwrap().as_dict().unwrap().clone();
            assert_eq!(note.get("P"), Some(&Object::Reference(page)));
            appearances.push(note.get("AP").unwrap().clone());

            let popup = dest.get_object(annots[1]).unwrap().unwrap().as_dict().unwrap().clone();
            assert_eq!(popup.get("P"), Some(&Object::Reference(page)));
            assert_eq!(popup.get("Parent"), Some(&Object::Reference(annots[0])));
        }
        // Appearance streams are still shared
        assert_eq!(appearances[0], appearances[1]);
    }

    #[test]
    fn test_same_identity_from_two_sources_is_not_shared() {
        let mut a = source_document();
        let mut b = source_document();
        let mut dest = Document::new();
        let mut copy_map = CopyMap::new();
        let mut diagnostics = Vec::new();

        let closure_a = closure(&mut a, 0).unwrap();
        let closure_b = closure(&mut b, 0).unwrap();
        let page_a =
            merge_closure(&mut a, 0, &closure_a, &mut dest, &mut copy_map, &mut diagnostics).unwrap();
        let page_b =
            merge_closure(&mut b, 1, &closure_b, &mut dest, &mut copy_map, &mut diagnostics).unwrap();

        assert_ne!(resources_of(&mut dest, page_a), resources_of(&mut dest, page_b));
    }

    #[test]
    fn test_dangling_reference_becomes_null() {
        let mut source = Document::new();
        let mut page = Dictionary::new();
        page.set("Type", Object::name("Page"));
        page.set("Thumb", ObjectId::new(90, 0));
        let page = source.add_object(page);
        source.append_page(page).unwrap();

        let mut dest = Document::new();
        let mut diagnostics = Vec::new();
        let copied = copy_page(&mut source, 0, &mut dest, &mut CopyMap::new(), &mut diagnostics);

        let dict = dest.get_object(copied).unwrap().unwrap().as_dict().unwrap();
        assert_eq!(dict.get("Thumb"), Some(&Object::Null));
        assert_eq!(
            diagnostics,
            vec![Diagnostic::Reference(ReferenceError {
                referrer: page,
                target: ObjectId::new(90, 0),
            })]
        );
    }
}
