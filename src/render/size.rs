#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Size<T> {
    pub(crate) width: T,
    pub(crate) height: T,
}
