pub type CheapClone<T> = std::rc::Rc<T>;

/// A [CheapClone] whose equality is pointer identity.
///
/// Dioxus props must be `PartialEq`; for handles that carry shared state
/// (settle pairs, slot bindings) the only meaningful equality is "same handle".
#[derive(Debug)]
pub struct EqCheapClone<T: ?Sized>(CheapClone<T>);
impl<T: ?Sized> Clone for EqCheapClone<T> {
    fn clone(&self) -> Self {
        Self(CheapClone::clone(&self.0))
    }
}
impl<T: ?Sized> PartialEq for EqCheapClone<T> {
    fn eq(&self, other: &Self) -> bool {
        CheapClone::ptr_eq(&self.0, &other.0)
    }
}
impl<T: ?Sized> Eq for EqCheapClone<T> {}
impl<T> EqCheapClone<T> {
    pub fn new(value: T) -> Self {
        Self(CheapClone::new(value))
    }
}
impl<T: Default> Default for EqCheapClone<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
impl<T: ?Sized> core::ops::Deref for EqCheapClone<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Cheap-clone immutable string, used for app keys and slot names
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CCStr(CheapClone<str>);
impl Clone for CCStr {
    fn clone(&self) -> Self {
        Self(CheapClone::clone(&self.0))
    }
}
impl Default for CCStr {
    fn default() -> Self {
        Self::from("")
    }
}

impl From<String> for CCStr {
    fn from(value: String) -> Self {
        CCStr(CheapClone::from(value))
    }
}
impl From<&str> for CCStr {
    fn from(value: &str) -> Self {
        CCStr(CheapClone::from(value))
    }
}
impl core::ops::Deref for CCStr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
impl AsRef<str> for CCStr {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl core::fmt::Display for CCStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
