use chrono::{Duration, TimeZone, Utc};
use mibu_engine::config::Config;
use mibu_engine::team::free_slots;
use proptest::prelude::*;
use sdk::types::BusySlot;

proptest! {
    #[test]
    fn test_config_parsing_round_trip(
        log_level in "error|warn|info|debug|trace",
        port in 1u16..=u16::MAX,
        classify in 0.0..=2.0f64,
        stability in 0.0..=1.0f64,
        quota in 0u32..10_000,
        ttl in 0i64..365,
    ) {
        let toml = format!(
            "[core]\nlog_level = \"{}\"\ndata_dir = \"/tmp/mibu\"\n\n\
             [server]\nport = {}\n\n\
             [llm]\nclassify_temperature = {:?}\n\n\
             [speech]\nstability = {:?}\n\n\
             [travel]\nmonthly_quota = {}\ncache_ttl_days = {}\n",
            log_level, port, classify, stability, quota, ttl
        );

        let config = Config::from_toml_str(&toml).unwrap();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let reparsed = Config::from_toml_str(&serialized).unwrap();

        prop_assert_eq!(&reparsed.core.log_level, &log_level);
        prop_assert_eq!(reparsed.server.port, port);
        prop_assert_eq!(reparsed.llm.classify_temperature, classify);
        prop_assert_eq!(reparsed.speech.stability, stability);
        prop_assert_eq!(reparsed.travel.monthly_quota, quota);
        prop_assert_eq!(reparsed.travel.cache_ttl_days, ttl);
    }

    #[test]
    fn test_out_of_range_temperature_rejected(t in 2.0001..100.0f64) {
        let toml = format!("[llm]\nbriefing_temperature = {:?}\n", t);
        prop_assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_free_slots_are_hour_long_and_inside_the_day(
        events in prop::collection::vec((0i64..600, 15i64..180), 0..6)
    ) {
        let day_start = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        let day_end = day_start + Duration::hours(9);
        let busy: Vec<BusySlot> = events
            .iter()
            .enumerate()
            .map(|(i, (offset, len))| {
                let start = day_start - Duration::minutes(60) + Duration::minutes(*offset);
                BusySlot {
                    id: i.to_string(),
                    title: format!("event {}", i),
                    start_time: start,
                    end_time: start + Duration::minutes(*len),
                }
            })
            .collect();

        let slots = free_slots(day_start, day_end, &busy);
        prop_assert!(slots.len() <= 18);
        for slot in &slots {
            prop_assert_eq!(slot.end - slot.start, Duration::hours(1));
            prop_assert!(slot.start >= day_start && slot.start < day_end);
            for b in &busy {
                prop_assert!(slot.end <= b.start_time || slot.start >= b.end_time);
            }
        }
    }
}
