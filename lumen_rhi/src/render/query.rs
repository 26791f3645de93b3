/// Query heap descriptor

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// Number of samples that passed the depth test
    SamplesPassed,
    /// Whether any sample passed the depth test
    AnySamplesPassed,
    /// GPU timestamp in nanoseconds
    TimeElapsed,
    PipelineStatistics,
}

/// Descriptor for creating a query heap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHeapDescriptor {
    pub debug_name: Option<String>,
    pub query_type: QueryType,
    pub num_queries: u32,
}
