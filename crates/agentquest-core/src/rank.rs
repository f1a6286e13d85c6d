/// Minimum XP for each rank title, ascending.
pub const RANK_THRESHOLDS: [(i64, &str); 6] = [
    (0, "Recruit"),
    (100, "Operative"),
    (500, "Specialist"),
    (1_500, "Field Agent"),
    (5_000, "Elite"),
    (15_000, "Legend"),
];

#[must_use]
pub fn rank_title(xp: i64) -> &'static str {
    RANK_THRESHOLDS
        .iter()
        .rev()
        .find(|(min_xp, _)| xp >= *min_xp)
        .map_or(RANK_THRESHOLDS[0].1, |(_, title)| *title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_boundaries() {
        assert_eq!(rank_title(-10), "Recruit");
        assert_eq!(rank_title(0), "Recruit");
        assert_eq!(rank_title(99), "Recruit");
        assert_eq!(rank_title(100), "Operative");
        assert_eq!(rank_title(1_499), "Specialist");
        assert_eq!(rank_title(1_500), "Field Agent");
        assert_eq!(rank_title(1_000_000), "Legend");
    }
}
