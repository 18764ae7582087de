mod common;

use camino::Utf8PathBuf;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use heliobench::catalog::generate_catalog;
use heliobench::constants::MJD;
use heliobench::earth_ephem::EarthEphemeris;
use heliobench::simulator::{HelioState, SyntheticObject};
use heliobench::truth::extract_truth;
use heliobench::{HeliobenchError, RunConfig, TrajectorySimulator, TwoBodySimulator};

fn small_config(object_count: usize) -> RunConfig {
    RunConfig::builder()
        .object_count(object_count)
        .make_tracklets_bin("make_tracklets")
        .heliolinc_bin("heliolinc")
        .earth_ephem_file("earth.txt")
        .obscode_file("ObsCodes.txt")
        .colformat_file("colformat.txt")
        .output_dir("./out")
        .build()
        .unwrap()
}

/// Purely radial motion `d(t) = d0(id) + v·(t − t_ref)`, giving each object
/// an exactly linear distance series the quadratic fit must reproduce.
struct LinearRadialSimulator {
    reference_epoch: MJD,
    velocity: f64,
}

impl TrajectorySimulator for LinearRadialSimulator {
    fn advance_to(
        &self,
        objects: &[SyntheticObject],
        epoch: MJD,
    ) -> Result<Vec<HelioState>, HeliobenchError> {
        let direction = Vector3::new(1.0, 0.0, 0.0);
        Ok(objects
            .iter()
            .map(|object| {
                let distance = 2.0
                    + 0.1 * object.object_id as f64
                    + self.velocity * (epoch - self.reference_epoch);
                HelioState {
                    position: direction * distance,
                    velocity: direction * self.velocity,
                }
            })
            .collect())
    }
}

#[test]
fn test_truth_recovers_linear_radial_motion() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let ephemeris =
        EarthEphemeris::from_file(&common::write_earth_ephemeris(&root, 60670.0, 30)).unwrap();

    let config = small_config(8);
    let simulator = LinearRadialSimulator {
        reference_epoch: config.reference_epoch,
        velocity: 0.01,
    };
    let mut rng = StdRng::seed_from_u64(11);

    let (records, _) = generate_catalog(&simulator, &config, &ephemeris, 0, &mut rng).unwrap();
    let truth = extract_truth(&records, config.reference_epoch, config.epoch_count()).unwrap();

    assert_eq!(truth.len(), 8);
    for record in &truth {
        let expected_distance = 2.0 + 0.1 * record.object_id as f64;
        assert!(
            (record.helio_dist - expected_distance).abs() < 1e-9,
            "object {}: dist {} != {expected_distance}",
            record.object_id,
            record.helio_dist
        );
        assert!((record.helio_vel - 0.01).abs() < 1e-9);
        assert!(record.helio_acc.abs() < 1e-9);
    }
}

#[test]
fn test_two_body_catalog_truth_structure() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let ephemeris =
        EarthEphemeris::from_file(&common::write_earth_ephemeris(&root, 60670.0, 30)).unwrap();

    let config = small_config(25);
    let mut rng = StdRng::seed_from_u64(4242);

    let (records, objects) =
        generate_catalog(&TwoBodySimulator, &config, &ephemeris, 500, &mut rng).unwrap();
    assert_eq!(records.len(), 25 * config.epoch_count());

    let truth = extract_truth(&records, config.reference_epoch, config.epoch_count()).unwrap();
    assert_eq!(truth.len(), 25);

    for (record, object) in truth.iter().zip(&objects) {
        assert_eq!(record.object_id, object.object_id);
        assert!(record.helio_dist.is_finite());
        assert!(record.helio_vel.is_finite());
        assert!(record.helio_acc.is_finite());
    }
    assert_eq!(truth[0].object_id, 500);
    assert_eq!(truth[24].object_id, 524);
}
