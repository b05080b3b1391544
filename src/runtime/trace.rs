/// Kind of node evaluated, recorded in evaluation order when tracing is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TraceEvent {
    Literal = 1,
    Variable = 2,
    Call = 3,
    Set = 4,
    If = 5,
    For = 6,
    Block = 7,
    Return = 8,
    ExprStatement = 9,
}

impl TraceEvent {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Renders a trace as its compact tag string, e.g. `7423`.
pub fn render_tags(trace: &[TraceEvent]) -> String {
    trace
        .iter()
        .map(|event| char::from(b'0' + event.tag()))
        .collect()
}
