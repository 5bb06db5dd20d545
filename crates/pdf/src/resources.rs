//! Page resource lookup and image XObject discovery.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;

/// Upper bound on `/Parent` hops when looking for inherited resources.
const MAX_TREE_DEPTH: usize = 64;

/// An image XObject reachable from a page.
pub struct ImageXObject<'a> {
    /// Object number and generation of the image stream.
    pub id: ObjectId,
    /// The image stream itself.
    pub stream: &'a Stream,
}

/// All image XObjects a page can draw, in resource order.
///
/// Resources are inherited from the page tree when the page has none of its
/// own. Form XObjects are searched recursively for the images they use.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Vec<ImageXObject<'_>> {
    let mut images = Vec::new();
    if let Some(resources) = page_resources(doc, page_id) {
        let mut visited_forms = HashSet::new();
        collect_images(doc, resources, &mut visited_forms, &mut images);
    }
    images
}

/// The `/Resources` dictionary in effect for a page.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }

    log::debug!("Page tree deeper than {} levels", MAX_TREE_DEPTH);
    None
}

fn collect_images<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    visited_forms: &mut HashSet<ObjectId>,
    images: &mut Vec<ImageXObject<'a>>,
) {
    let Some(xobjects) = resources.get(b"XObject").ok().and_then(|o| resolve_dict(doc, o)) else {
        return;
    };

    for (name, value) in xobjects.iter() {
        let Ok(id) = value.as_reference() else {
            log::debug!("XObject {} is not an indirect object", String::from_utf8_lossy(name));
            continue;
        };
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            log::debug!("XObject {} {} is not a stream", id.0, id.1);
            continue;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => images.push(ImageXObject { id, stream }),
            Ok(b"Form") => {
                if !visited_forms.insert(id) {
                    continue;
                }
                if let Some(form_resources) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve_dict(doc, o))
                {
                    collect_images(doc, form_resources, visited_forms, images);
                }
            }
            _ => {}
        }
    }
}

/// Follow references to a dictionary.
pub(crate) fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    doc.dereference(object)
        .ok()
        .and_then(|(_, object)| object.as_dict().ok())
}
