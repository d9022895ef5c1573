/// One page of results plus the total row count of the unpaged query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults<T> {
    pub results: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl<T> QueryResults<T> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryResults<U> {
        QueryResults {
            results: self.results.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}
