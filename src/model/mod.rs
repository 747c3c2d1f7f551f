use crate::using;

using! {
    pub kind,
    pub navigation,
    pub resource,
}
