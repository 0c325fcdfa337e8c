use super::{Matcher, Predicate};
use crate::block::Block;
use crate::errors::Result;
use crate::store::Store;

/// Negates another condition. Block statistics say nothing useful about the
/// complement, so every block is scanned.
pub struct Not {
    inner: Box<dyn Predicate>,
}

impl Not {
    pub fn new(inner: impl Predicate + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

struct NotMatcher<'s> {
    inner: Box<dyn Matcher + 's>,
}

impl Matcher for NotMatcher<'_> {
    fn check_block(&self, _block: &Block) -> bool {
        true
    }

    fn check_value(&self, position: usize) -> bool {
        !self.inner.check_value(position)
    }
}

impl Predicate for Not {
    fn prepare<'s>(&self, store: &'s Store) -> Result<Box<dyn Matcher + 's>> {
        Ok(Box::new(NotMatcher {
            inner: self.inner.prepare(store)?,
        }))
    }
}

/// Matches if any child matches, stopping at the first that does. A block is
/// admitted if any child admits it. With no children nothing matches.
pub struct Or {
    children: Vec<Box<dyn Predicate>>,
}

impl Or {
    pub fn new(children: Vec<Box<dyn Predicate>>) -> Self {
        Self { children }
    }

    pub fn push(mut self, child: impl Predicate + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }
}

struct OrMatcher<'s> {
    children: Vec<Box<dyn Matcher + 's>>,
}

impl Matcher for OrMatcher<'_> {
    fn check_block(&self, block: &Block) -> bool {
        self.children.iter().any(|c| c.check_block(block))
    }

    fn check_value(&self, position: usize) -> bool {
        self.children.iter().any(|c| c.check_value(position))
    }
}

impl Predicate for Or {
    fn prepare<'s>(&self, store: &'s Store) -> Result<Box<dyn Matcher + 's>> {
        let children = self
            .children
            .iter()
            .map(|c| c.prepare(store))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(OrMatcher { children }))
    }
}
