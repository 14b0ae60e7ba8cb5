//! Raw value sources: the pull-style input a datagram materializes from.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use iondg_ll_buffer::Buffer;

use crate::symbols::SymbolTable;
use crate::value::Element;
use crate::Result;

/// Location of a value's encoding in a byte arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// One top-level value pulled from a source.
///
/// At least one of `element` and `span` is set. A value with only a span is
/// decoded lazily from the arena the source hands over in
/// [`RawSource::take_buffer`].
#[derive(Clone, Debug)]
pub struct RawValue {
    pub element: Option<Element>,
    pub span: Option<Span>,
    /// The table in effect for this value. Values sharing a table share the
    /// same `Arc`.
    pub symbols: Arc<SymbolTable>,
    /// Bookkeeping value (version marker, symbol table, embedded value).
    pub hidden: bool,
    /// The existing encoding, if any, cannot be kept as is.
    pub stale: bool,
}

/// Pull-style producer of top-level values.
pub trait RawSource {
    fn has_next(&mut self) -> Result<bool>;

    /// The next value. Only valid after `has_next` returned `true`.
    fn next(&mut self) -> Result<RawValue>;

    /// Release the source. Called exactly once, on every exit path of
    /// materialization.
    fn close(&mut self);

    /// Hand over the arena the spans refer to. Sources without one return
    /// `None`.
    fn take_buffer(&mut self) -> Option<Buffer> {
        None
    }
}

impl<S: RawSource + ?Sized> RawSource for Box<S> {
    fn has_next(&mut self) -> Result<bool> {
        (**self).has_next()
    }

    fn next(&mut self) -> Result<RawValue> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn take_buffer(&mut self) -> Option<Buffer> {
        (**self).take_buffer()
    }
}

/// Closes the wrapped source when dropped.
pub(crate) struct CloseGuard<'a, S: RawSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: RawSource + ?Sized> CloseGuard<'a, S> {
    pub(crate) fn new(source: &'a mut S) -> Self {
        Self { source }
    }
}

impl<S: RawSource + ?Sized> Deref for CloseGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: RawSource + ?Sized> DerefMut for CloseGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: RawSource + ?Sized> Drop for CloseGuard<'_, S> {
    fn drop(&mut self) {
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct Counting {
        closed: usize,
    }

    impl RawSource for Counting {
        fn has_next(&mut self) -> Result<bool> {
            Ok(false)
        }

        fn next(&mut self) -> Result<RawValue> {
            Err(Error::decode("empty"))
        }

        fn close(&mut self) {
            self.closed += 1;
        }
    }

    #[test]
    fn guard_closes_once_on_drop() {
        let mut source = Counting { closed: 0 };
        {
            let mut guard = CloseGuard::new(&mut source);
            assert!(!guard.has_next().unwrap());
            assert!(guard.next().is_err());
        }
        assert_eq!(source.closed, 1);
    }

    #[test]
    fn boxed_sources_forward() {
        let mut source: Box<dyn RawSource> = Box::new(Counting { closed: 0 });
        assert!(!source.has_next().unwrap());
        assert!(source.take_buffer().is_none());
    }

    #[test]
    fn span_end() {
        assert_eq!(Span::new(4, 3).end(), 7);
    }
}
