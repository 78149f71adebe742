//! Image widget payload.

use notemark_syntax::{SyntaxNode, SyntaxTree};

/// An inline image rendered in place of its markdown.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageWidget {
    /// Destination as written.
    pub src: String,
    /// Alt text.
    pub alt: String,
    /// Optional title.
    pub title: Option<String>,
    /// The host failed to load `src`; render the placeholder instead.
    pub failed: bool,
}

impl ImageWidget {
    /// Widget for an `Image` node.
    pub fn from_node(node: &SyntaxNode, tree: &SyntaxTree) -> Self {
        Self {
            src: node.detail.clone().unwrap_or_default(),
            alt: node.plain_text(tree.source()),
            title: node.title.clone(),
            failed: false,
        }
    }

    /// Text shown when the image cannot be displayed.
    pub fn placeholder(&self) -> &str {
        if self.alt.is_empty() {
            &self.src
        } else {
            &self.alt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notemark_syntax::{NodeKind, parse};

    #[test]
    fn test_from_node() {
        let tree = parse("![a cat](cat.png \"Cat\")");
        let node = tree.find_all(|k| k == NodeKind::Image)[0];
        let image = ImageWidget::from_node(node, &tree);
        assert_eq!(image.src, "cat.png");
        assert_eq!(image.alt, "a cat");
        assert_eq!(image.title.as_deref(), Some("Cat"));
        assert_eq!(image.placeholder(), "a cat");
    }

    #[test]
    fn test_placeholder_falls_back_to_src() {
        let tree = parse("![](x.png)");
        let node = tree.find_all(|k| k == NodeKind::Image)[0];
        assert_eq!(ImageWidget::from_node(node, &tree).placeholder(), "x.png");
    }
}
