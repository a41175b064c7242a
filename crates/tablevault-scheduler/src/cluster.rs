//! Cluster profiles for backup jobs.
//!
//! Profiles are ordered ascending by the total table size they can handle;
//! a job gets the smallest profile whose ceiling exceeds its cumulative
//! table size.

/// Sizing of the compute cluster a backup job runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterProfile {
    pub master_instance_type: &'static str,
    pub core_instance_type: &'static str,
    pub core_instance_count: u32,
    /// Memory tuning pushed into the cluster configuration verbatim.
    pub cluster_memory: &'static str,
    /// Ceiling on the cumulative size of tables backed up on this profile.
    pub max_total_size_bytes: u64,
}

pub const CLUSTER_PROFILES: &[ClusterProfile] = &[
    ClusterProfile {
        master_instance_type: "m1.medium",
        core_instance_type: "m1.medium",
        core_instance_count: 1,
        cluster_memory: "--yarn-key-value,yarn.nodemanager.resource.memory-mb=2048,\
                         --yarn-key-value,yarn.scheduler.maximum-allocation-mb=2048,\
                         --yarn-key-value,yarn.scheduler.minimum-allocation-mb=256,\
                         --mapred-key-value,mapreduce.map.memory.mb=768,\
                         --mapred-key-value,mapreduce.reduce.memory.mb=1024,\
                         --mapred-key-value,mapreduce.map.speculative=false",
        max_total_size_bytes: 597_688_320, // 570 MB
    },
    ClusterProfile {
        master_instance_type: "m3.xlarge",
        core_instance_type: "m3.xlarge",
        core_instance_count: 1,
        cluster_memory: "--yarn-key-value,yarn.nodemanager.resource.memory-mb=11520,\
                         --yarn-key-value,yarn.scheduler.maximum-allocation-mb=11520,\
                         --yarn-key-value,yarn.scheduler.minimum-allocation-mb=1440,\
                         --mapred-key-value,mapreduce.map.memory.mb=5760,\
                         --mapred-key-value,mapreduce.reduce.memory.mb=2880,\
                         --mapred-key-value,mapreduce.map.speculative=false",
        max_total_size_bytes: 1_099_511_627_776_000, // 1 PB
    },
];

/// The smallest profile whose ceiling exceeds the given total size.
pub fn select_profile(total_size_bytes: u64) -> Option<&'static ClusterProfile> {
    CLUSTER_PROFILES
        .iter()
        .find(|profile| total_size_bytes < profile.max_total_size_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_jobs_get_the_small_profile() {
        let profile = select_profile(100 * 1024 * 1024).unwrap();
        assert_eq!(profile.master_instance_type, "m1.medium");
    }

    #[test]
    fn ceiling_is_exclusive() {
        // Exactly at the small ceiling spills into the next profile.
        let profile = select_profile(597_688_320).unwrap();
        assert_eq!(profile.master_instance_type, "m3.xlarge");
    }

    #[test]
    fn oversized_jobs_have_no_profile() {
        assert!(select_profile(2_000_000_000_000_000).is_none());
    }

    #[test]
    fn profiles_are_ordered_ascending() {
        for pair in CLUSTER_PROFILES.windows(2) {
            assert!(pair[0].max_total_size_bytes < pair[1].max_total_size_bytes);
        }
    }
}
