crate::using! {
    pub status,
    pub table,
}
