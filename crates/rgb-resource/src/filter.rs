//! Composable resource predicates.
//!
//! A [`ResourceFilter`] answers "may this (resource, tag) pair live here?".
//! Filters are pure, immutable and cheap to clone (shared behind an `Rc`).

use std::{fmt, ops::Not, rc::Rc};

use crate::resource::Resource;

type Predicate<R> = dyn Fn(&R, Option<&<R as Resource>::Tag>) -> bool;

enum Node<R: Resource> {
    Any,
    Reject,
    Resource(R),
    Exact(R, Option<R::Tag>),
    Not(ResourceFilter<R>),
    All(Vec<ResourceFilter<R>>),
    AnyOf(Vec<ResourceFilter<R>>),
    Predicate(Box<Predicate<R>>),
}

/// A pure predicate over `(resource, tag)` pairs.
pub struct ResourceFilter<R: Resource> {
    node: Rc<Node<R>>,
}

impl<R: Resource> ResourceFilter<R> {
    fn from_node(node: Node<R>) -> Self {
        Self {
            node: Rc::new(node),
        }
    }

    /// Accepts every resource.
    #[must_use]
    pub fn any() -> Self {
        Self::from_node(Node::Any)
    }

    /// Accepts nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::from_node(Node::Reject)
    }

    /// Accepts `resource` with any tag.
    #[must_use]
    pub fn of_resource(resource: R) -> Self {
        Self::from_node(Node::Resource(resource))
    }

    /// Accepts `resource` with exactly `tag` (`None` only matches untagged).
    #[must_use]
    pub fn of_resource_and_tag(resource: R, tag: Option<R::Tag>) -> Self {
        Self::from_node(Node::Exact(resource, tag))
    }

    /// Accepts any of `resources`, with any tag.
    #[must_use]
    pub fn of_resources(resources: impl IntoIterator<Item = R>) -> Self {
        Self::from_node(Node::AnyOf(
            resources.into_iter().map(Self::of_resource).collect(),
        ))
    }

    /// Accepts what `predicate` accepts.
    #[must_use]
    pub fn predicate(predicate: impl Fn(&R, Option<&R::Tag>) -> bool + 'static) -> Self {
        Self::from_node(Node::Predicate(Box::new(predicate)))
    }

    /// Accepts what `self` rejects.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self::from_node(Node::Not(self.clone()))
    }

    /// Accepts what both `self` and `other` accept.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        let mut parts = Vec::with_capacity(2);
        for filter in [self, other] {
            match &*filter.node {
                Node::All(inner) => parts.extend(inner.iter().cloned()),
                _ => parts.push(filter.clone()),
            }
        }
        Self::from_node(Node::All(parts))
    }

    /// Accepts what either `self` or `other` accepts.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        let mut parts = Vec::with_capacity(2);
        for filter in [self, other] {
            match &*filter.node {
                Node::AnyOf(inner) => parts.extend(inner.iter().cloned()),
                _ => parts.push(filter.clone()),
            }
        }
        Self::from_node(Node::AnyOf(parts))
    }

    /// Test a possibly blank resource.
    ///
    /// Blank never matches: insertion handles the blank case before it
    /// consults a filter.
    #[must_use]
    pub fn test(&self, resource: Option<&R>, tag: Option<&R::Tag>) -> bool {
        resource.is_some_and(|resource| self.matches(resource, tag))
    }

    /// Test a concrete resource.
    #[must_use]
    pub fn matches(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        match &*self.node {
            Node::Any => true,
            Node::Reject => false,
            Node::Resource(expected) => expected == resource,
            Node::Exact(expected, expected_tag) => {
                expected == resource && expected_tag.as_ref() == tag
            }
            Node::Not(inner) => !inner.matches(resource, tag),
            Node::All(parts) => parts.iter().all(|part| part.matches(resource, tag)),
            Node::AnyOf(parts) => parts.iter().any(|part| part.matches(resource, tag)),
            Node::Predicate(predicate) => predicate(resource, tag),
        }
    }

    /// Whether this filter is the unconditional [`any`](Self::any) filter.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(*self.node, Node::Any)
    }

    /// Whether this filter is the unconditional [`none`](Self::none) filter.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(*self.node, Node::Reject)
    }
}

impl<R: Resource> Clone for ResourceFilter<R> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<R: Resource> Default for ResourceFilter<R> {
    fn default() -> Self {
        Self::any()
    }
}

impl<R: Resource> Not for ResourceFilter<R> {
    type Output = Self;

    fn not(self) -> Self {
        self.negate()
    }
}

impl<R: Resource> fmt::Debug for ResourceFilter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.node {
            Node::Any => f.write_str("Any"),
            Node::Reject => f.write_str("None"),
            Node::Resource(resource) => f.debug_tuple("Resource").field(resource).finish(),
            Node::Exact(resource, tag) => {
                f.debug_tuple("Exact").field(resource).field(tag).finish()
            }
            Node::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Node::All(parts) => f.debug_tuple("All").field(parts).finish(),
            Node::AnyOf(parts) => f.debug_tuple("AnyOf").field(parts).finish(),
            Node::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
