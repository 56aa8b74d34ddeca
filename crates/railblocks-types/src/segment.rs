//! The closed table of physical track segment names.
//!
//! Segment names identify track hardware on the model railway installation.
//! The table is fixed at build time; [`Segment`] is a validated index into
//! it. Whether a name refers to a segment that is actually wired up is not
//! checked anywhere in the core.

use std::fmt;

use crate::arity::Repetition;
use crate::node::NodeId;

/// All known segment names, grouped by station/line area.
pub const SEGMENT_NAMES: [&str; 48] = [
    "KH_ST_0", "KH_ST_1", "KH_ST_2", "KH_ST_3", "KH_ST_4", "KH_ST_5", "KH_ST_6",
    "KH_LN_0", "KH_LN_1", "KH_LN_2", "KH_LN_3", "KH_LN_4", "KH_LN_5", "KH_LN_6",
    "KH_LN_7", "KH_LN_8",
    "KIO_LN_0", "KIO_LN_1",
    "OC_ST_0", "OC_ST_1", "OC_ST_2", "OC_ST_3", "OC_ST_4",
    "OC_LN_0", "OC_LN_1", "OC_LN_2", "OC_LN_3", "OC_LN_4", "OC_LN_5",
    "IC_ST_0", "IC_ST_1", "IC_ST_2", "IC_ST_3", "IC_ST_4",
    "IC_LN_0", "IC_LN_1", "IC_LN_2", "IC_LN_3", "IC_LN_4", "IC_LN_5",
    "OC_JCT_0", "IC_JCT_0",
    "OI_LN_0", "OI_LN_1", "OI_LN_2",
    "IO_LN_0", "IO_LN_1", "IO_LN_2",
];

/// A validated index into [`SEGMENT_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment(u8);

impl Segment {
    pub const KH_ST_0: Segment = Segment(0);
    pub const KH_ST_1: Segment = Segment(1);
    pub const KH_ST_2: Segment = Segment(2);
    pub const KH_ST_3: Segment = Segment(3);
    pub const KH_ST_4: Segment = Segment(4);
    pub const KH_ST_5: Segment = Segment(5);
    pub const KH_ST_6: Segment = Segment(6);
    pub const KH_LN_0: Segment = Segment(7);
    pub const KH_LN_1: Segment = Segment(8);
    pub const KH_LN_2: Segment = Segment(9);
    pub const KH_LN_3: Segment = Segment(10);
    pub const KH_LN_4: Segment = Segment(11);
    pub const KH_LN_5: Segment = Segment(12);
    pub const KH_LN_6: Segment = Segment(13);
    pub const KH_LN_7: Segment = Segment(14);
    pub const KH_LN_8: Segment = Segment(15);
    pub const KIO_LN_0: Segment = Segment(16);
    pub const KIO_LN_1: Segment = Segment(17);
    pub const OC_ST_0: Segment = Segment(18);
    pub const OC_ST_1: Segment = Segment(19);
    pub const OC_ST_2: Segment = Segment(20);
    pub const OC_ST_3: Segment = Segment(21);
    pub const OC_ST_4: Segment = Segment(22);
    pub const OC_LN_0: Segment = Segment(23);
    pub const OC_LN_1: Segment = Segment(24);
    pub const OC_LN_2: Segment = Segment(25);
    pub const OC_LN_3: Segment = Segment(26);
    pub const OC_LN_4: Segment = Segment(27);
    pub const OC_LN_5: Segment = Segment(28);
    pub const IC_ST_0: Segment = Segment(29);
    pub const IC_ST_1: Segment = Segment(30);
    pub const IC_ST_2: Segment = Segment(31);
    pub const IC_ST_3: Segment = Segment(32);
    pub const IC_ST_4: Segment = Segment(33);
    pub const IC_LN_0: Segment = Segment(34);
    pub const IC_LN_1: Segment = Segment(35);
    pub const IC_LN_2: Segment = Segment(36);
    pub const IC_LN_3: Segment = Segment(37);
    pub const IC_LN_4: Segment = Segment(38);
    pub const IC_LN_5: Segment = Segment(39);
    pub const OC_JCT_0: Segment = Segment(40);
    pub const IC_JCT_0: Segment = Segment(41);
    pub const OI_LN_0: Segment = Segment(42);
    pub const OI_LN_1: Segment = Segment(43);
    pub const OI_LN_2: Segment = Segment(44);
    pub const IO_LN_0: Segment = Segment(45);
    pub const IO_LN_1: Segment = Segment(46);
    pub const IO_LN_2: Segment = Segment(47);

    /// Look up a segment by name. Returns `None` for names outside the table.
    pub fn parse(name: &str) -> Option<Segment> {
        SEGMENT_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| Segment(i as u8))
    }

    /// The segment's name as it appears in generated RailSL.
    pub fn name(self) -> &'static str {
        SEGMENT_NAMES[self.0 as usize]
    }

    /// Iterate over every segment in table order.
    pub fn all() -> impl Iterator<Item = Segment> {
        (0..SEGMENT_NAMES.len()).map(|i| Segment(i as u8))
    }
}

impl Default for Segment {
    fn default() -> Self {
        Segment::KH_ST_0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Repetition for Segment {
    fn default_rep() -> Self {
        Segment::default()
    }

    fn on_remove(&mut self) -> Option<NodeId> {
        None
    }
}
