use std::future::Future;

use anyhow::Result;

use crate::folio::dom::Document;
use crate::folio::media::{Attachment, AttachmentFetcher, MediaResolver};

/// A synchronous, in-place rewrite of the document tree.
///
/// Implementations must be idempotent and leave the tree untouched when
/// nothing matches.
pub trait Transformer: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform(&self, doc: &Document) -> Result<()>;
}

/// A stage that replaces media placeholders with resolved elements.
///
/// All resolutions are awaited before the tree is written. Returns the
/// attachments that were applied, in document order.
pub trait MediaProcessor {
    fn process<F: AttachmentFetcher>(
        &self,
        doc: &Document,
        resolver: &mut MediaResolver<'_, F>,
    ) -> impl Future<Output = Vec<Attachment>>;
}
