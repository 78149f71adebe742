//! Host services the session calls out to.
//!
//! Each service is a trait so hosts can plug in their storage and window management. Closures
//! with the matching signature implement the traits directly.

use thiserror::Error;

/// Failure reported by a host collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Saving the note failed.
    #[error("save failed: {0}")]
    Save(String),
    /// Closing the note failed.
    #[error("close failed: {0}")]
    Close(String),
    /// Importing an image failed.
    #[error("image import failed: {0}")]
    Import(String),
}

/// Acknowledgement of a successful save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveAck {
    /// Where the host stored the note, if it reports it.
    pub location: Option<String>,
}

/// A note the link resolver matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkCandidate {
    /// Stable identifier.
    pub id: String,
    /// Display text; becomes the link text.
    pub label: String,
    /// Link target.
    pub location: String,
}

/// Persists note content.
pub trait Saver {
    /// Save `content`.
    fn save(&mut self, content: &str) -> Result<SaveAck, CollaboratorError>;
}

/// Closes the note's window or view.
pub trait Closer {
    /// Close the note.
    fn close(&mut self) -> Result<(), CollaboratorError>;
}

/// Finds notes for link completion.
pub trait LinkResolver {
    /// Up to `limit` candidates matching `query`.
    fn resolve(&self, query: &str, limit: usize) -> Vec<LinkCandidate>;
}

/// Stores pasted or dropped images.
pub trait ImageImporter {
    /// Store `bytes` of type `mime` and return the URL or path to embed.
    fn import(&mut self, bytes: &[u8], mime: &str) -> Result<String, CollaboratorError>;
}

impl<F> Saver for F
where
    F: FnMut(&str) -> Result<SaveAck, CollaboratorError>,
{
    fn save(&mut self, content: &str) -> Result<SaveAck, CollaboratorError> {
        self(content)
    }
}

impl<F> Closer for F
where
    F: FnMut() -> Result<(), CollaboratorError>,
{
    fn close(&mut self) -> Result<(), CollaboratorError> {
        self()
    }
}

impl<F> LinkResolver for F
where
    F: Fn(&str, usize) -> Vec<LinkCandidate>,
{
    fn resolve(&self, query: &str, limit: usize) -> Vec<LinkCandidate> {
        self(query, limit)
    }
}

impl<F> ImageImporter for F
where
    F: FnMut(&[u8], &str) -> Result<String, CollaboratorError>,
{
    fn import(&mut self, bytes: &[u8], mime: &str) -> Result<String, CollaboratorError> {
        self(bytes, mime)
    }
}

struct NoLinks;

impl LinkResolver for NoLinks {
    fn resolve(&self, _query: &str, _limit: usize) -> Vec<LinkCandidate> {
        Vec::new()
    }
}

struct NoImages;

impl ImageImporter for NoImages {
    fn import(&mut self, _bytes: &[u8], mime: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Import(format!(
            "no image importer for {mime}"
        )))
    }
}

/// The host services of one session.
pub struct Collaborators {
    pub(crate) saver: Box<dyn Saver>,
    pub(crate) closer: Box<dyn Closer>,
    pub(crate) links: Box<dyn LinkResolver>,
    pub(crate) images: Box<dyn ImageImporter>,
}

impl Collaborators {
    /// Services with the required save and close hooks. Link completion yields nothing and
    /// image import fails until replaced.
    pub fn new(saver: impl Saver + 'static, closer: impl Closer + 'static) -> Self {
        Self {
            saver: Box::new(saver),
            closer: Box::new(closer),
            links: Box::new(NoLinks),
            images: Box::new(NoImages),
        }
    }

    /// Replace the link resolver.
    pub fn with_link_resolver(mut self, links: impl LinkResolver + 'static) -> Self {
        self.links = Box::new(links);
        self
    }

    /// Replace the image importer.
    pub fn with_image_importer(mut self, images: impl ImageImporter + 'static) -> Self {
        self.images = Box::new(images);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mut services = Collaborators::new(
            |_: &str| Ok(SaveAck::default()),
            || Ok(()),
        );
        assert!(services.links.resolve("any", 5).is_empty());
        assert!(matches!(
            services.images.import(b"png", "image/png"),
            Err(CollaboratorError::Import(_))
        ));
        assert_eq!(services.saver.save("x"), Ok(SaveAck::default()));
        assert_eq!(services.closer.close(), Ok(()));
    }
}
