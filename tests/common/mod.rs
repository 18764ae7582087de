//! Shared fixtures for the integration tests: a synthetic Earth state table,
//! the pass-through input files, and stand-in shell scripts for the two
//! external executables.

// Each test binary compiles this module separately and uses its own subset.
#![allow(dead_code)]

use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use camino::{Utf8Path, Utf8PathBuf};

/// Write a circular 1 AU Earth ephemeris in the external tools' format
/// (MJD, positions in km, velocities in km/s), one row per day.
pub fn write_earth_ephemeris(dir: &Utf8Path, start: f64, days: usize) -> Utf8PathBuf {
    const AU_KM: f64 = 149_597_870.7;
    let omega = std::f64::consts::TAU / 365.25; // rad/day
    let speed = AU_KM * omega / 86_400.0; // km/s

    let mut contents = String::from("# MJD x(km) y(km) z(km) vx(km/s) vy(km/s) vz(km/s)\n");
    for day in 0..days {
        let theta = omega * day as f64;
        contents.push_str(&format!(
            "{} {} {} 0.0 {} {} 0.0\n",
            start + day as f64,
            AU_KM * theta.cos(),
            AU_KM * theta.sin(),
            -speed * theta.sin(),
            speed * theta.cos(),
        ));
    }
    let path = dir.join("earth_states.txt");
    fs::write(&path, contents).unwrap();
    path
}

/// Write the two files the Tracklet Builder consumes verbatim: an MPC
/// observatory-code table and the catalog column map.
pub fn write_passthrough_inputs(dir: &Utf8Path) -> (Utf8PathBuf, Utf8PathBuf) {
    let obscode = dir.join("ObsCodes.txt");
    fs::write(
        &obscode,
        "W84 289.193583 0.749891 +0.659534  Cerro Tololo-DECam\n",
    )
    .unwrap();

    let colformat = dir.join("colformat.txt");
    fs::write(
        &colformat,
        "IDCOL 1\nMJDCOL 2\nRACOL 3\nDECCOL 4\nMAGCOL 5\nBANDCOL 6\nOBSCODECOL 7\n",
    )
    .unwrap();

    (obscode, colformat)
}

/// Write an executable `/bin/sh` script.
#[cfg(unix)]
pub fn write_script(path: &Utf8Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut permissions = fs::metadata(path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions).unwrap();
}

/// Stand-in Tracklet Builder: copies the catalog into pairdets and emits one
/// pair row per two detection rows, enough for full pair coverage.
#[cfg(unix)]
pub const MAKE_TRACKLETS_STUB: &str = r#"dets=""; pairdets=""; pairs=""
while [ $# -gt 0 ]; do
  case "$1" in
    -dets) dets="$2"; shift 2 ;;
    -pairdets) pairdets="$2"; shift 2 ;;
    -pairs) pairs="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "stub make_tracklets: pairing $dets"
cat "$dets" > "$pairdets"
awk -F, 'NR > 1 && NR % 2 == 0 { print NR-2 "," NR-1 }' "$dets" > "$pairs"
"#;

#[cfg(unix)]
const HELIOLINC_PRELUDE: &str = r#"pairdets=""; out=""; outsum=""
while [ $# -gt 0 ]; do
  case "$1" in
    -pairdets) pairdets="$2"; shift 2 ;;
    -out) out="$2"; shift 2 ;;
    -outsum) outsum="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "stub heliolinc: clustering $pairdets"
"#;

#[cfg(unix)]
const HELIOLINC_CLUSTERING: &str = r##"awk -F, '
  NR == 1 {
    print "#clusternum,idstring,mjd" > out
    print "#clusternum,posrms,heliodist,heliovel,helioacc" > outsum
    next
  }
  {
    if (!($1 in cluster)) {
      cluster[$1] = ++n
      printf "%d,0.1,%.4f,0.001,0.0001\n", n, 2.0 + n > outsum
    }
    printf "%d,%s,%s\n", cluster[$1], $1, $2 > out
  }
' out="$out" outsum="$outsum" "$pairdets"
"##;

/// Stand-in Cluster Linker: groups the pairdets rows by idstring, one
/// cluster per object, numbered from 1 in first-seen order. `guard` is
/// inserted after argument parsing (empty for the plain stub).
#[cfg(unix)]
pub fn write_heliolinc_stub(path: &Utf8Path, guard: &str) {
    write_script(path, &[HELIOLINC_PRELUDE, guard, HELIOLINC_CLUSTERING].concat());
}

/// Write the plain stub pair and return `(make_tracklets, heliolinc)` paths.
#[cfg(unix)]
pub fn write_stub_tools(dir: &Utf8Path) -> (Utf8PathBuf, Utf8PathBuf) {
    let make_tracklets = dir.join("make_tracklets");
    write_script(&make_tracklets, MAKE_TRACKLETS_STUB);

    let heliolinc = dir.join("heliolinc");
    write_heliolinc_stub(&heliolinc, "");

    (make_tracklets, heliolinc)
}
