use std::{fmt, sync::Arc};

/// Identity of a guarded object: its address and static type.
///
/// Diagnostics always print this instead of the object itself, so building
/// an error message never runs code that could re-enter a checked path.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    addr: usize,
    type_name: &'static str,
    zero_sized: bool,
}

impl ObjectRef {
    pub fn of<T: ?Sized>(obj: &T) -> Self {
        Self {
            addr: obj as *const T as *const () as usize,
            type_name: std::any::type_name::<T>(),
            zero_sized: std::mem::size_of_val(obj) == 0,
        }
    }

    pub(crate) fn from_parts(addr: usize, type_name: &'static str) -> Self {
        Self {
            addr,
            type_name,
            zero_sized: false,
        }
    }

    pub fn of_arc<T: ?Sized>(arc: &Arc<T>) -> Self {
        Self::of::<T>(&**arc)
    }

    #[inline]
    pub fn addr(&self) -> usize {
        self.addr
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Zero-sized values share addresses and so have no identity of their own.
    #[inline]
    pub fn is_zero_sized(&self) -> bool {
        self.zero_sized
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.type_name, self.addr)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i32,
        _y: i32,
    }

    #[test]
    fn field_and_struct_differ_by_type() {
        let p = Point { x: 1, _y: 2 };
        let whole = ObjectRef::of(&p);
        let field = ObjectRef::of(&p.x);

        assert_eq!(whole.addr(), field.addr());
        assert_ne!(whole, field);
    }

    #[test]
    fn zero_sized_is_flagged() {
        assert!(ObjectRef::of(&()).is_zero_sized());
        assert!(!ObjectRef::of(&0u8).is_zero_sized());
    }

    #[test]
    fn display_is_identity_only() {
        let val = 7u32;
        let shown = ObjectRef::of(&val).to_string();
        assert!(shown.starts_with("u32@0x"));
    }
}
