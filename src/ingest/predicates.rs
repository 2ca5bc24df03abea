//! Recognised geometry predicate IRIs (§Glossary, §4.5). Fixed namespaces,
//! matched by exact IRI string comparison — case-sensitive.

pub const WGS84_LAT: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#lat";
pub const WGS84_LONG: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#long";
pub const GEORSS_POINT: &str = "http://www.georss.org/georss/point";
pub const GEOSPARQL_AS_WKT: &str = "http://www.opengis.net/ont/OGC-GeoSPARQL/1.0/asWKT";
pub const OSG_AS_GEOJSON: &str = "http://data.ordnancesurvey.co.uk/ontology/geometry/asGeoJSON";
pub const OSG_AS_GML: &str = "http://data.ordnancesurvey.co.uk/ontology/geometry/asGML";
