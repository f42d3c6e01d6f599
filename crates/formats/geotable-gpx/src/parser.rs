//! Streaming GPX parser.
//!
//! The document is walked with a pull reader and a tagged section state:
//! `Document`, a waypoint, a route (optionally inside a route point), or a
//! track (optionally inside a segment, optionally inside a track point).
//! Opening an element that is not valid in the current section raises
//! `MalformedSource`. Tables are created lazily on the first element of
//! their kind, parent rows always enter their batch before the buffered
//! child rows enter theirs, and batches flush in parent-first order.

use std::io::BufRead;
use std::mem;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};

use geotable_core_common::{
    Geom, GeotableError, ProgressNode, Result, TableRef, TabularStore, Value,
};

use crate::tables;

const BATCH_MAX_SIZE: usize = 100;

/// The six table references derived from the target prefix. Building the
/// set validates every derived name before any statement is issued.
pub(crate) struct TableSet {
    pub(crate) waypoint: TableRef,
    pub(crate) route: TableRef,
    pub(crate) routepoint: TableRef,
    pub(crate) track: TableRef,
    pub(crate) tracksegment: TableRef,
    pub(crate) trackpoint: TableRef,
}

impl TableSet {
    pub(crate) fn new(prefix: &TableRef) -> Result<Self> {
        Ok(TableSet {
            waypoint: prefix.with_suffix(tables::WAYPOINT_SUFFIX)?,
            route: prefix.with_suffix(tables::ROUTE_SUFFIX)?,
            routepoint: prefix.with_suffix(tables::ROUTEPOINT_SUFFIX)?,
            track: prefix.with_suffix(tables::TRACK_SUFFIX)?,
            tracksegment: prefix.with_suffix(tables::TRACKSEGMENT_SUFFIX)?,
            trackpoint: prefix.with_suffix(tables::TRACKPOINT_SUFFIX)?,
        })
    }

    pub(crate) fn all(&self) -> [&TableRef; 6] {
        [
            &self.waypoint,
            &self.route,
            &self.routepoint,
            &self.track,
            &self.tracksegment,
            &self.trackpoint,
        ]
    }
}

fn malformed(message: impl Into<String>) -> GeotableError {
    GeotableError::malformed("GPX", message)
}

fn xml_error(err: &quick_xml::Error) -> GeotableError {
    malformed(err.to_string())
}

/// Descriptive fields shared by waypoints, route points and track points.
#[derive(Default)]
struct PointData {
    lat: f64,
    lon: f64,
    ele: Option<String>,
    time: Option<String>,
    name: Option<String>,
    cmt: Option<String>,
    desc: Option<String>,
    src: Option<String>,
    sym: Option<String>,
    kind: Option<String>,
}

impl PointData {
    fn from_attributes(e: &BytesStart) -> Result<Self> {
        Ok(PointData {
            lat: coord_attribute(e, "lat")?,
            lon: coord_attribute(e, "lon")?,
            ..PointData::default()
        })
    }

    fn accepts(field: &[u8]) -> bool {
        matches!(
            field,
            b"ele" | b"time" | b"name" | b"cmt" | b"desc" | b"src" | b"sym" | b"type"
        )
    }

    fn append(&mut self, field: &[u8], text: &str) {
        let slot = match field {
            b"ele" => &mut self.ele,
            b"time" => &mut self.time,
            b"name" => &mut self.name,
            b"cmt" => &mut self.cmt,
            b"desc" => &mut self.desc,
            b"src" => &mut self.src,
            b"sym" => &mut self.sym,
            b"type" => &mut self.kind,
            _ => return,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    /// The shared column prefix of a point row.
    fn into_row(self, geom: Geom, id: i64) -> Result<Vec<Value>> {
        let ele = match self.ele {
            Some(text) => Some(
                text.parse::<f64>()
                    .map_err(|_| malformed(format!("invalid elevation '{text}'")))?,
            ),
            None => None,
        };
        Ok(vec![
            Value::from(geom),
            Value::Int(id),
            Value::Double(self.lat),
            Value::Double(self.lon),
            Value::from(ele),
            Value::from(self.time),
            Value::from(self.name),
            Value::from(self.cmt),
            Value::from(self.desc),
            Value::from(self.src),
            Value::from(self.sym),
            Value::from(self.kind),
        ])
    }
}

/// Descriptive fields shared by routes and tracks.
#[derive(Default)]
struct MetaData {
    name: Option<String>,
    cmt: Option<String>,
    desc: Option<String>,
    src: Option<String>,
    number: Option<String>,
    kind: Option<String>,
}

impl MetaData {
    fn accepts(field: &[u8]) -> bool {
        matches!(
            field,
            b"name" | b"cmt" | b"desc" | b"src" | b"number" | b"type"
        )
    }

    fn append(&mut self, field: &[u8], text: &str) {
        let slot = match field {
            b"name" => &mut self.name,
            b"cmt" => &mut self.cmt,
            b"desc" => &mut self.desc,
            b"src" => &mut self.src,
            b"number" => &mut self.number,
            b"type" => &mut self.kind,
            _ => return,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    fn into_row(self, geom: Geom, id: i64) -> Result<Vec<Value>> {
        let number = match self.number {
            Some(text) => Some(
                text.parse::<i64>()
                    .map_err(|_| malformed(format!("invalid number '{text}'")))?,
            ),
            None => None,
        };
        Ok(vec![
            Value::from(geom),
            Value::Int(id),
            Value::from(self.name),
            Value::from(self.cmt),
            Value::from(self.desc),
            Value::from(self.src),
            Value::from(number),
            Value::from(self.kind),
        ])
    }
}

struct RouteData {
    id: i64,
    meta: MetaData,
    coords: Vec<(f64, f64)>,
    next_sequence: i64,
    point_rows: Vec<Vec<Value>>,
}

struct SegmentData {
    id: i64,
    sequence: i64,
    coords: Vec<(f64, f64)>,
    next_sequence: i64,
    point_rows: Vec<Vec<Value>>,
}

struct TrackData {
    id: i64,
    meta: MetaData,
    segments: Vec<Vec<(f64, f64)>>,
    next_sequence: i64,
    segment_rows: Vec<Vec<Value>>,
    point_rows: Vec<Vec<Value>>,
}

enum Section {
    Document,
    Waypoint(PointData),
    Route(RouteData),
    RoutePoint(RouteData, PointData),
    Track(TrackData),
    Segment(TrackData, SegmentData),
    TrackPoint(TrackData, SegmentData, PointData),
}

/// Per-table pending rows, flushed parents before children.
#[derive(Default)]
struct Batches {
    waypoints: Vec<Vec<Value>>,
    routes: Vec<Vec<Value>>,
    routepoints: Vec<Vec<Value>>,
    tracks: Vec<Vec<Value>>,
    segments: Vec<Vec<Value>>,
    trackpoints: Vec<Vec<Value>>,
}

fn coord_attribute(e: &BytesStart, name: &str) -> Result<f64> {
    let attribute = e
        .try_get_attribute(name)
        .map_err(|err| malformed(err.to_string()))?
        .ok_or_else(|| malformed(format!("missing '{name}' attribute")))?;
    let text = attribute
        .unescape_value()
        .map_err(|err| malformed(err.to_string()))?;
    text.parse()
        .map_err(|_| malformed(format!("invalid '{name}' attribute value '{text}'")))
}

pub(crate) struct GpxImporter<'a> {
    store: &'a mut dyn TabularStore,
    tables: &'a TableSet,
    node: ProgressNode,
    srid: i32,
    file_size: u64,
    section: Section,
    current_field: Option<Vec<u8>>,
    skip_depth: usize,
    batches: Batches,
    created: Vec<String>,
    waypoint_tables: bool,
    route_tables: bool,
    track_tables: bool,
    next_waypoint_id: i64,
    next_route_id: i64,
    next_routepoint_id: i64,
    next_track_id: i64,
    next_segment_id: i64,
    next_trackpoint_id: i64,
}

impl<'a> GpxImporter<'a> {
    pub(crate) fn new(
        store: &'a mut dyn TabularStore,
        tables: &'a TableSet,
        srid: i32,
        progress: &ProgressNode,
    ) -> Self {
        GpxImporter {
            store,
            tables,
            node: progress.sub_process(100),
            srid,
            file_size: 0,
            section: Section::Document,
            current_field: None,
            skip_depth: 0,
            batches: Batches::default(),
            created: Vec::new(),
            waypoint_tables: false,
            route_tables: false,
            track_tables: false,
            next_waypoint_id: 1,
            next_route_id: 1,
            next_routepoint_id: 1,
            next_track_id: 1,
            next_segment_id: 1,
            next_trackpoint_id: 1,
        }
    }

    /// Parses the document and returns the names of the tables created, in
    /// creation order. `file_size` is the on-disk size used for percent
    /// progress; for compressed sources the position is clamped at 100.
    pub(crate) fn run(mut self, source: impl BufRead, file_size: u64) -> Result<Vec<String>> {
        self.file_size = file_size;
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            let event = reader.read_event_into(&mut buf);
            match event {
                Err(err) => return Err(xml_error(&err)),
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) => {
                    self.checkpoint(reader.buffer_position())?;
                    self.on_start(&e)?;
                },
                Ok(Event::Empty(e)) => {
                    self.checkpoint(reader.buffer_position())?;
                    self.on_empty(&e)?;
                },
                Ok(Event::Text(t)) => self.on_text(&t)?,
                Ok(Event::End(e)) => self.on_end(e.local_name().as_ref())?,
                Ok(_) => {},
            }
            buf.clear();
        }
        if !matches!(self.section, Section::Document) {
            return Err(malformed("unexpected end of document"));
        }
        self.flush(true)?;
        self.node.end_of_progress();
        Ok(self.created)
    }

    fn checkpoint(&self, position: u64) -> Result<()> {
        if self.node.is_cancelled() {
            return Err(GeotableError::Cancelled);
        }
        if self.file_size > 0 {
            self.node.set_step(position * 100 / self.file_size);
        }
        Ok(())
    }

    fn on_start(&mut self, e: &BytesStart) -> Result<()> {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return Ok(());
        }
        match e.local_name().as_ref() {
            b"gpx" => Ok(()),
            b"metadata" | b"extensions" => {
                self.skip_depth = 1;
                Ok(())
            },
            b"wpt" => self.open_waypoint(e),
            b"rte" => self.open_route(),
            b"rtept" => self.open_routepoint(e),
            b"trk" => self.open_track(),
            b"trkseg" => self.open_segment(),
            b"trkpt" => self.open_trackpoint(e),
            leaf => {
                let accepted = match &self.section {
                    Section::Waypoint(_) | Section::RoutePoint(..) | Section::TrackPoint(..) => {
                        PointData::accepts(leaf)
                    },
                    Section::Route(_) | Section::Track(_) => MetaData::accepts(leaf),
                    Section::Document | Section::Segment(..) => false,
                };
                if accepted {
                    self.current_field = Some(leaf.to_vec());
                } else {
                    self.skip_depth = 1;
                }
                Ok(())
            },
        }
    }

    /// A self-closing element is an open immediately followed by a close.
    fn on_empty(&mut self, e: &BytesStart) -> Result<()> {
        if self.skip_depth > 0 {
            return Ok(());
        }
        match e.local_name().as_ref() {
            b"wpt" => {
                self.open_waypoint(e)?;
                self.close_waypoint()
            },
            b"rte" => {
                self.open_route()?;
                self.close_route()
            },
            b"rtept" => {
                self.open_routepoint(e)?;
                self.close_routepoint()
            },
            b"trk" => {
                self.open_track()?;
                self.close_track()
            },
            b"trkseg" => {
                self.open_segment()?;
                self.close_segment()
            },
            b"trkpt" => {
                self.open_trackpoint(e)?;
                self.close_trackpoint()
            },
            _ => Ok(()),
        }
    }

    fn on_text(&mut self, t: &BytesText) -> Result<()> {
        if self.skip_depth > 0 {
            return Ok(());
        }
        let Some(field) = self.current_field.clone() else {
            return Ok(());
        };
        let text = t.unescape().map_err(|err| xml_error(&err))?;
        match &mut self.section {
            Section::Waypoint(p) | Section::RoutePoint(_, p) => p.append(&field, &text),
            Section::TrackPoint(_, _, p) => p.append(&field, &text),
            Section::Route(route) => route.meta.append(&field, &text),
            Section::Track(track) => track.meta.append(&field, &text),
            Section::Document | Section::Segment(..) => {},
        }
        Ok(())
    }

    fn on_end(&mut self, name: &[u8]) -> Result<()> {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return Ok(());
        }
        if self.current_field.as_deref() == Some(name) {
            self.current_field = None;
            return Ok(());
        }
        match name {
            b"wpt" => self.close_waypoint(),
            b"rte" => self.close_route(),
            b"rtept" => self.close_routepoint(),
            b"trk" => self.close_track(),
            b"trkseg" => self.close_segment(),
            b"trkpt" => self.close_trackpoint(),
            _ => Ok(()),
        }
    }

    fn ensure_waypoint_table(&mut self) -> Result<()> {
        if !self.waypoint_tables {
            self.store
                .create_table(&self.tables.waypoint, &tables::waypoint_columns(self.srid))?;
            self.created.push(self.tables.waypoint.to_string());
            self.waypoint_tables = true;
        }
        Ok(())
    }

    fn ensure_route_tables(&mut self) -> Result<()> {
        if !self.route_tables {
            self.store
                .create_table(&self.tables.route, &tables::route_columns(self.srid))?;
            self.store.create_table(
                &self.tables.routepoint,
                &tables::routepoint_columns(self.srid),
            )?;
            self.created.push(self.tables.route.to_string());
            self.created.push(self.tables.routepoint.to_string());
            self.route_tables = true;
        }
        Ok(())
    }

    fn ensure_track_tables(&mut self) -> Result<()> {
        if !self.track_tables {
            self.store
                .create_table(&self.tables.track, &tables::track_columns(self.srid))?;
            self.store.create_table(
                &self.tables.tracksegment,
                &tables::tracksegment_columns(self.srid),
            )?;
            self.store.create_table(
                &self.tables.trackpoint,
                &tables::trackpoint_columns(self.srid),
            )?;
            self.created.push(self.tables.track.to_string());
            self.created.push(self.tables.tracksegment.to_string());
            self.created.push(self.tables.trackpoint.to_string());
            self.track_tables = true;
        }
        Ok(())
    }

    fn open_waypoint(&mut self, e: &BytesStart) -> Result<()> {
        if !matches!(self.section, Section::Document) {
            return Err(malformed("'wpt' element out of place"));
        }
        let point = PointData::from_attributes(e)?;
        self.ensure_waypoint_table()?;
        self.section = Section::Waypoint(point);
        Ok(())
    }

    fn close_waypoint(&mut self) -> Result<()> {
        let Section::Waypoint(point) = mem::replace(&mut self.section, Section::Document) else {
            return Err(malformed("unexpected 'wpt' end tag"));
        };
        let geom = Geom::point(point.lon, point.lat, self.srid);
        let id = self.next_waypoint_id;
        self.next_waypoint_id += 1;
        let row = point.into_row(geom, id)?;
        self.batches.waypoints.push(row);
        self.flush(false)
    }

    fn open_route(&mut self) -> Result<()> {
        if !matches!(self.section, Section::Document) {
            return Err(malformed("'rte' element out of place"));
        }
        self.ensure_route_tables()?;
        let id = self.next_route_id;
        self.next_route_id += 1;
        self.section = Section::Route(RouteData {
            id,
            meta: MetaData::default(),
            coords: Vec::new(),
            next_sequence: 0,
            point_rows: Vec::new(),
        });
        Ok(())
    }

    fn open_routepoint(&mut self, e: &BytesStart) -> Result<()> {
        let Section::Route(route) = mem::replace(&mut self.section, Section::Document) else {
            return Err(malformed("'rtept' element outside of 'rte'"));
        };
        let point = PointData::from_attributes(e)?;
        self.section = Section::RoutePoint(route, point);
        Ok(())
    }

    fn close_routepoint(&mut self) -> Result<()> {
        let Section::RoutePoint(mut route, point) =
            mem::replace(&mut self.section, Section::Document)
        else {
            return Err(malformed("unexpected 'rtept' end tag"));
        };
        let geom = Geom::point(point.lon, point.lat, self.srid);
        route.coords.push((point.lon, point.lat));
        let id = self.next_routepoint_id;
        self.next_routepoint_id += 1;
        let sequence = route.next_sequence;
        route.next_sequence += 1;
        let mut row = point.into_row(geom, id)?;
        row.push(Value::Int(route.id));
        row.push(Value::Int(sequence));
        route.point_rows.push(row);
        self.section = Section::Route(route);
        Ok(())
    }

    fn close_route(&mut self) -> Result<()> {
        let Section::Route(route) = mem::replace(&mut self.section, Section::Document) else {
            return Err(malformed("unexpected 'rte' end tag"));
        };
        // The route row enters its batch before the buffered point rows
        // enter theirs; a route without points keeps a single row with an
        // empty linestring.
        let geom = Geom::line(&route.coords, self.srid);
        let row = route.meta.into_row(geom, route.id)?;
        self.batches.routes.push(row);
        self.batches.routepoints.extend(route.point_rows);
        self.flush(false)
    }

    fn open_track(&mut self) -> Result<()> {
        if !matches!(self.section, Section::Document) {
            return Err(malformed("'trk' element out of place"));
        }
        self.ensure_track_tables()?;
        let id = self.next_track_id;
        self.next_track_id += 1;
        self.section = Section::Track(TrackData {
            id,
            meta: MetaData::default(),
            segments: Vec::new(),
            next_sequence: 0,
            segment_rows: Vec::new(),
            point_rows: Vec::new(),
        });
        Ok(())
    }

    fn open_segment(&mut self) -> Result<()> {
        let Section::Track(mut track) = mem::replace(&mut self.section, Section::Document) else {
            return Err(malformed("'trkseg' element outside of 'trk'"));
        };
        let id = self.next_segment_id;
        self.next_segment_id += 1;
        let sequence = track.next_sequence;
        track.next_sequence += 1;
        self.section = Section::Segment(
            track,
            SegmentData {
                id,
                sequence,
                coords: Vec::new(),
                next_sequence: 0,
                point_rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn open_trackpoint(&mut self, e: &BytesStart) -> Result<()> {
        let Section::Segment(track, segment) = mem::replace(&mut self.section, Section::Document)
        else {
            return Err(malformed("'trkpt' element outside of 'trkseg'"));
        };
        let point = PointData::from_attributes(e)?;
        self.section = Section::TrackPoint(track, segment, point);
        Ok(())
    }

    fn close_trackpoint(&mut self) -> Result<()> {
        let Section::TrackPoint(track, mut segment, point) =
            mem::replace(&mut self.section, Section::Document)
        else {
            return Err(malformed("unexpected 'trkpt' end tag"));
        };
        let geom = Geom::point(point.lon, point.lat, self.srid);
        segment.coords.push((point.lon, point.lat));
        let id = self.next_trackpoint_id;
        self.next_trackpoint_id += 1;
        let sequence = segment.next_sequence;
        segment.next_sequence += 1;
        let mut row = point.into_row(geom, id)?;
        row.push(Value::Int(segment.id));
        row.push(Value::Int(sequence));
        segment.point_rows.push(row);
        self.section = Section::Segment(track, segment);
        Ok(())
    }

    fn close_segment(&mut self) -> Result<()> {
        let Section::Segment(mut track, segment) =
            mem::replace(&mut self.section, Section::Document)
        else {
            return Err(malformed("unexpected 'trkseg' end tag"));
        };
        let row = vec![
            Value::from(Geom::line(&segment.coords, self.srid)),
            Value::Int(segment.id),
            Value::Int(track.id),
            Value::Int(segment.sequence),
        ];
        track.segments.push(segment.coords);
        track.segment_rows.push(row);
        track.point_rows.extend(segment.point_rows);
        self.section = Section::Track(track);
        Ok(())
    }

    fn close_track(&mut self) -> Result<()> {
        let Section::Track(track) = mem::replace(&mut self.section, Section::Document) else {
            return Err(malformed("unexpected 'trk' end tag"));
        };
        let geom = Geom::multi_line(&track.segments, self.srid);
        let row = track.meta.into_row(geom, track.id)?;
        self.batches.tracks.push(row);
        self.batches.segments.extend(track.segment_rows);
        self.batches.trackpoints.extend(track.point_rows);
        self.flush(false)
    }

    /// Flushes every pending batch in parent-first order, either when
    /// forced or once any batch reaches the size limit. Flushing all
    /// batches together keeps parent rows committed before child rows.
    fn flush(&mut self, force: bool) -> Result<()> {
        let b = &mut self.batches;
        let largest = [
            b.waypoints.len(),
            b.routes.len(),
            b.routepoints.len(),
            b.tracks.len(),
            b.segments.len(),
            b.trackpoints.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        if !force && largest < BATCH_MAX_SIZE {
            return Ok(());
        }
        flush_one(self.store, &self.tables.waypoint, &mut b.waypoints)?;
        flush_one(self.store, &self.tables.route, &mut b.routes)?;
        flush_one(self.store, &self.tables.routepoint, &mut b.routepoints)?;
        flush_one(self.store, &self.tables.track, &mut b.tracks)?;
        flush_one(self.store, &self.tables.tracksegment, &mut b.segments)?;
        flush_one(self.store, &self.tables.trackpoint, &mut b.trackpoints)
    }
}

fn flush_one(
    store: &mut dyn TabularStore,
    table: &TableRef,
    rows: &mut Vec<Vec<Value>>,
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    store.append_batch(table, mem::take(rows))
}
