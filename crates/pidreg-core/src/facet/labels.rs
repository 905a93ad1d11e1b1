// Display labels for keys whose titles are not derivable from the key.

pub(super) const LICENSES: &[(&str, &str)] = &[
    ("afl-1.1", "AFL-1.1"),
    ("apache-2.0", "Apache-2.0"),
    ("bsd-2-clause", "BSD-2-Clause"),
    ("bsd-3-clause", "BSD-3-Clause"),
    ("cc-by-1.0", "CC-BY-1.0"),
    ("cc-by-2.0", "CC-BY-2.0"),
    ("cc-by-2.5", "CC-BY-2.5"),
    ("cc-by-3.0", "CC-BY-3.0"),
    ("cc-by-4.0", "CC-BY-4.0"),
    ("cc-by-nc-2.0", "CC-BY-NC-2.0"),
    ("cc-by-nc-3.0", "CC-BY-NC-3.0"),
    ("cc-by-nc-4.0", "CC-BY-NC-4.0"),
    ("cc-by-nc-nd-3.0", "CC-BY-NC-ND-3.0"),
    ("cc-by-nc-nd-4.0", "CC-BY-NC-ND-4.0"),
    ("cc-by-nc-sa-3.0", "CC-BY-NC-SA-3.0"),
    ("cc-by-nc-sa-4.0", "CC-BY-NC-SA-4.0"),
    ("cc-by-nd-4.0", "CC-BY-ND-4.0"),
    ("cc-by-sa-3.0", "CC-BY-SA-3.0"),
    ("cc-by-sa-4.0", "CC-BY-SA-4.0"),
    ("cc-pddc", "CC-PDDC"),
    ("cc0-1.0", "CC0-1.0"),
    ("gpl-2.0", "GPL-2.0"),
    ("gpl-3.0", "GPL-3.0"),
    ("isc", "ISC"),
    ("lgpl-2.1", "LGPL-2.1"),
    ("mit", "MIT"),
    ("mpl-2.0", "MPL-2.0"),
    ("odc-by-1.0", "ODC-By-1.0"),
    ("odbl-1.0", "ODbL-1.0"),
    ("ogl-uk-3.0", "OGL-UK-3.0"),
    ("pddl-1.0", "PDDL-1.0"),
];

pub(super) const SOURCES: &[(&str, &str)] = &[
    ("api", "API"),
    ("ez", "EZ"),
    ("fabrica", "Fabrica"),
    ("fabricaForm", "Fabrica Form"),
    ("levriero", "Levriero"),
    ("mds", "MDS"),
    ("test", "Test"),
];

pub(super) const AGENCIES: &[(&str, &str)] = &[
    ("airiti", "Airiti"),
    ("cnki", "CNKI"),
    ("crossref", "Crossref"),
    ("datacite", "DataCite"),
    ("istic", "ISTIC"),
    ("jalc", "JaLC"),
    ("kisti", "KISTI"),
    ("medra", "mEDRA"),
    ("op", "OP"),
];

pub(super) fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, label)| *label)
}
