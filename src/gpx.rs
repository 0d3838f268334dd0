use crate::types::Workout;
use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes every workout as a GPX 1.1 waypoint at its map position.
pub fn export_gpx(path: &Path, workouts: &[Workout]) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("creating file: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_gpx(&mut out, workouts)
        .with_context(|| format!("writing GPX: {}", path.display()))?;
    out.flush()
        .with_context(|| format!("flushing GPX: {}", path.display()))?;
    tracing::info!(path = %path.display(), waypoints = workouts.len(), "gpx exported");
    Ok(workouts.len())
}

pub fn write_gpx<W: Write>(out: W, workouts: &[Workout]) -> Result<()> {
    let mut xml = Writer::new_with_indent(out, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut gpx = BytesStart::new("gpx");
    gpx.push_attribute(("version", "1.1"));
    gpx.push_attribute(("creator", "geolog"));
    gpx.push_attribute(("xmlns", "http://www.topografix.com/GPX/1/1"));
    xml.write_event(Event::Start(gpx))?;

    for w in workouts {
        let c = w.coords();
        let lat = c.lat.to_string();
        let lon = c.lng.to_string();
        let mut wpt = BytesStart::new("wpt");
        wpt.push_attribute(("lat", lat.as_str()));
        wpt.push_attribute(("lon", lon.as_str()));
        xml.write_event(Event::Start(wpt))?;

        // GPX fixes the child order: time, name, desc, type.
        text_element(&mut xml, "time", &w.created_at().to_rfc3339())?;
        text_element(&mut xml, "name", w.description())?;
        text_element(&mut xml, "desc", &waypoint_desc(w))?;
        text_element(&mut xml, "type", w.kind().as_str())?;

        xml.write_event(Event::End(BytesEnd::new("wpt")))?;
    }

    xml.write_event(Event::End(BytesEnd::new("gpx")))?;
    Ok(())
}

fn waypoint_desc(w: &Workout) -> String {
    format!(
        "id={} distance_km={} duration_min={}",
        w.id(),
        w.distance_km(),
        w.duration_min()
    )
}

fn text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WorkoutStore;
    use crate::types::{Coordinates, KindInput, WorkoutForm};
    use quick_xml::reader::Reader;

    fn workouts() -> Vec<Workout> {
        let mut store = WorkoutStore::new();
        let run = store
            .create(
                Coordinates::new(38.72, -9.14),
                &WorkoutForm {
                    distance_km: 5.0,
                    duration_min: 25.0,
                    input: KindInput::Running { cadence_spm: 178.0 },
                },
            )
            .unwrap();
        let ride = store
            .create(
                Coordinates::new(38.70, -9.2),
                &WorkoutForm {
                    distance_km: 20.0,
                    duration_min: 60.0,
                    input: KindInput::Cycling {
                        elevation_gain_m: 300.0,
                    },
                },
            )
            .unwrap();
        vec![run, ride]
    }

    #[test]
    fn test_writes_one_waypoint_per_workout() {
        let ws = workouts();
        let mut buf = Vec::new();
        write_gpx(&mut buf, &ws).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut xml = Reader::from_str(&text);
        xml.config_mut().trim_text(true);
        let mut points = Vec::new();
        loop {
            match xml.read_event().unwrap() {
                Event::Eof => break,
                Event::Start(e) if e.name().as_ref() == b"wpt" => {
                    let mut lat = None;
                    let mut lon = None;
                    for a in e.attributes().flatten() {
                        let v = a.unescape_value().unwrap().parse::<f64>().ok();
                        match a.key.as_ref() {
                            b"lat" => lat = v,
                            b"lon" => lon = v,
                            _ => {}
                        }
                    }
                    points.push((lat.unwrap(), lon.unwrap()));
                }
                _ => {}
            }
        }

        assert_eq!(points, vec![(38.72, -9.14), (38.70, -9.2)]);
        assert!(text.contains("<type>running</type>"));
        assert!(text.contains("<type>cycling</type>"));
        assert!(text.contains(ws[1].description()));
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workouts.gpx");
        assert_eq!(export_gpx(&path, &workouts()).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.trim_end().ends_with("</gpx>"));
    }
}
