use geosampler_datatypes::primitives::{gps, PointInfo};
use geosampler_datatypes::util::FileDictionary;

use super::{GroupOrdering, RasterGroup};
use crate::util::config::{DoyRange, SamplerParameters};
use crate::util::Result;

/// Post-filters the groups found for a point.
///
/// Groups are referenced by their position in the group arena of the call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFilter {
    pub url_substring: Option<String>,
    pub doy_range: Option<DoyRange>,
    /// Closest-time target in GPS seconds.
    pub closest_time: Option<i64>,
    pub use_poi_time: bool,
}

impl GroupFilter {
    pub fn from_parameters(parameters: &SamplerParameters) -> Result<Self> {
        Ok(Self {
            url_substring: parameters.url_substring.clone(),
            doy_range: parameters.filter_doy_range,
            closest_time: parameters.closest_time()?,
            use_poi_time: parameters.use_poi_time,
        })
    }

    /// The closest-time target for `point`: its own time if enabled and set, else the configured one.
    pub fn target_time(&self, point: &PointInfo) -> Option<i64> {
        match point.gps {
            Some(gps) if self.use_poi_time && gps > 0 => Some(gps),
            _ => self.closest_time,
        }
    }

    /// Applies all configured filters and returns whether any group is left.
    pub fn apply(
        &self,
        ordering: &mut GroupOrdering<usize>,
        groups: &[RasterGroup],
        dictionary: &FileDictionary,
        target_time: Option<i64>,
    ) -> bool {
        if let Some(substring) = &self.url_substring {
            filter_url_substring(ordering, groups, dictionary, substring);
        }

        if let Some(doy) = &self.doy_range {
            filter_day_of_year(ordering, groups, doy);
        }

        // GPS time 0 means no target
        if let Some(target) = target_time.filter(|&target| target > 0) {
            filter_closest_time(ordering, groups, target);
        }

        !ordering.is_empty()
    }
}

/// Removes groups without any raster whose path contains `substring`.
pub fn filter_url_substring(
    ordering: &mut GroupOrdering<usize>,
    groups: &[RasterGroup],
    dictionary: &FileDictionary,
    substring: &str,
) {
    ordering.retain(|&group| {
        groups.get(group).is_some_and(|group| {
            group.infos.iter().any(|info| {
                dictionary
                    .get(info.file_id)
                    .is_some_and(|path| path.contains(substring))
            })
        })
    });
}

/// Keeps groups whose day of year is inside the range, or outside if `keep_in_range` is unset.
/// Undated groups count as outside.
pub fn filter_day_of_year(
    ordering: &mut GroupOrdering<usize>,
    groups: &[RasterGroup],
    doy: &DoyRange,
) {
    ordering.retain(|&group| {
        let in_range = groups
            .get(group)
            .and_then(|group| group.date.as_ref())
            .is_some_and(|date| gps::doy_in_range(date, doy.start, doy.end));
        in_range == doy.keep_in_range
    });
}

/// Keeps the groups acquired closest to `target`. Groups with equal distance are all kept.
pub fn filter_closest_time(ordering: &mut GroupOrdering<usize>, groups: &[RasterGroup], target: i64) {
    let delta = |group: usize| groups.get(group).map(|g| (g.gps_time - target).abs());

    let Some(min_delta) = ordering.values().filter_map(|&group| delta(group)).min() else {
        return;
    };

    ordering.retain(|&group| delta(group) == Some(min_delta));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{RasterInfo, RasterTag};
    use geosampler_datatypes::primitives::GmtDate;

    fn timed_group(feature_id: u64, gps_time: i64) -> RasterGroup {
        let mut group = RasterGroup::new(feature_id, None, Vec::new());
        group.gps_time = gps_time;
        group
    }

    fn ordering_of(groups: &[RasterGroup]) -> GroupOrdering<usize> {
        let mut ordering = GroupOrdering::new();
        for index in 0..groups.len() {
            ordering.insert(index);
        }
        ordering
    }

    #[test]
    fn closest_time_keeps_ties() {
        let groups: Vec<RasterGroup> = [10, 20, 20, 50]
            .iter()
            .enumerate()
            .map(|(i, &t)| timed_group(i as u64, t))
            .collect();
        let mut ordering = ordering_of(&groups);

        filter_closest_time(&mut ordering, &groups, 20);

        assert_eq!(ordering.values().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn closest_time_between_groups() {
        let groups: Vec<RasterGroup> = [10, 20, 50]
            .iter()
            .enumerate()
            .map(|(i, &t)| timed_group(i as u64, t))
            .collect();
        let mut ordering = ordering_of(&groups);

        filter_closest_time(&mut ordering, &groups, 40);

        assert_eq!(ordering.values().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn zero_target_time_keeps_all_groups() {
        let groups: Vec<RasterGroup> = [10, 20, 50]
            .iter()
            .enumerate()
            .map(|(i, &t)| timed_group(i as u64, t))
            .collect();
        let mut ordering = ordering_of(&groups);

        let filter = GroupFilter::default();
        assert!(filter.apply(&mut ordering, &groups, &FileDictionary::new(), Some(0)));

        assert_eq!(ordering.len(), 3);
    }

    #[test]
    fn point_without_time_uses_configured_target() {
        let filter = GroupFilter {
            closest_time: Some(1000),
            use_poi_time: true,
            ..Default::default()
        };

        assert_eq!(filter.target_time(&PointInfo::new(0., 0.).with_gps(500)), Some(500));
        assert_eq!(filter.target_time(&PointInfo::new(0., 0.).with_gps(0)), Some(1000));
        assert_eq!(filter.target_time(&PointInfo::new(0., 0.)), Some(1000));

        let filter = GroupFilter {
            use_poi_time: true,
            ..Default::default()
        };
        assert_eq!(filter.target_time(&PointInfo::new(0., 0.).with_gps(0)), None);
    }

    #[test]
    fn url_substring_needs_one_matching_raster() {
        let mut dictionary = FileDictionary::new();
        let a_value = dictionary.add("/data/a/value.tif");
        let a_flags = dictionary.add("/other/a/flags.tif");
        let b_value = dictionary.add("/other/b/value.tif");

        let groups = vec![
            RasterGroup::new(
                0,
                None,
                vec![
                    RasterInfo::new(a_value, RasterTag::Value),
                    RasterInfo::new(a_flags, RasterTag::Flags),
                ],
            ),
            RasterGroup::new(1, None, vec![RasterInfo::new(b_value, RasterTag::Value)]),
        ];
        let mut ordering = ordering_of(&groups);

        filter_url_substring(&mut ordering, &groups, &dictionary, "/data/");

        assert_eq!(ordering.values().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn day_of_year_in_and_out_of_range() {
        let date = |s: &str| Some(GmtDate::parse(s).unwrap());
        let groups = vec![
            RasterGroup::new(0, date("2021-01-15T00:00:00Z"), Vec::new()),
            RasterGroup::new(1, date("2021-07-01T00:00:00Z"), Vec::new()),
            RasterGroup::new(2, None, Vec::new()),
        ];

        let mut keep = ordering_of(&groups);
        filter_day_of_year(
            &mut keep,
            &groups,
            &DoyRange {
                start: 1,
                end: 31,
                keep_in_range: true,
            },
        );
        assert_eq!(keep.values().copied().collect::<Vec<_>>(), vec![0]);

        let mut drop = ordering_of(&groups);
        filter_day_of_year(
            &mut drop,
            &groups,
            &DoyRange {
                start: 1,
                end: 31,
                keep_in_range: false,
            },
        );
        assert_eq!(drop.values().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn apply_reports_empty_result() {
        let dictionary = FileDictionary::new();
        let groups = vec![timed_group(0, 100)];
        let filter = GroupFilter {
            url_substring: Some("missing".to_owned()),
            ..Default::default()
        };

        let mut ordering = ordering_of(&groups);
        assert!(!filter.apply(&mut ordering, &groups, &dictionary, None));

        let mut ordering = ordering_of(&groups);
        assert!(GroupFilter::default().apply(&mut ordering, &groups, &dictionary, Some(5)));
    }

    #[test]
    fn point_time_overrides_configured_target() {
        let filter = GroupFilter {
            closest_time: Some(7),
            use_poi_time: true,
            ..Default::default()
        };
        assert_eq!(filter.target_time(&PointInfo::new(0., 0.).with_gps(3)), Some(3));
        assert_eq!(filter.target_time(&PointInfo::new(0., 0.)), Some(7));

        let filter = GroupFilter {
            closest_time: Some(7),
            ..Default::default()
        };
        assert_eq!(filter.target_time(&PointInfo::new(0., 0.).with_gps(3)), Some(7));
    }
}
