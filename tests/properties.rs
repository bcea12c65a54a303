//! Integration test: invariants that hold for any run

mod common;

use common::{init_logging, part_xml, uri, DocxBuilder, HEADER};
use docx_sweep::cruft::{Action, Finding};
use docx_sweep::opc::{rel_types, ParsedPackage};
use docx_sweep::{
    executor, Category, CategorySet, Error, Graph, Mode, ProtectedConfig, ProtectedSet,
    Reachability, RemovalPlan, SweepConfig, Sweeper,
};
use pretty_assertions::assert_eq;

const STYLES: &str = concat!(
    r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/></w:style>"#,
    r#"<w:style w:type="character" w:styleId="Ghost"><w:name w:val="Ghost"/></w:style>"#,
    r#"<w:style w:type="table" w:styleId="TB4"><w:name w:val="Table Grid 4"/></w:style>"#,
);

/// A document with something for every category
fn cluttered() -> DocxBuilder {
    DocxBuilder::new()
        .body(concat!(
            r#"<w:p w:rsidR="00A1" w:rsidRDefault="00A1"><w:pPr w:rsidR="00A1"/>"#,
            r#"<w:bookmarkStart w:id="0" w:name="_GoBack"/><w:bookmarkEnd w:id="0"/>"#,
            r#"<w:bookmarkStart w:id="1" w:name="Chapter1"/><w:bookmarkEnd w:id="1"/>"#,
            r#"<w:proofErr w:type="spellStart"/><w:r w:rsidRPr="00B2"><w:t>Helo</w:t></w:r><w:proofErr w:type="spellEnd"/>"#,
            r#"<w:r><w:rPr><w:rStyle w:val="Ghost"/></w:rPr></w:r>"#,
            r#"<w:hyperlink r:id="rId8" w:history="1"><w:r><w:t>tracked</w:t></w:r></w:hyperlink>"#,
            r#"<w:r><w:drawing><a:blip r:embed="rId6"/></w:drawing></w:r></w:p>"#,
        ))
        .styles(STYLES)
        .settings(concat!(
            r#"<w:proofState w:spelling="clean" w:grammar="clean"/>"#,
            r#"<w:compat><w:useFELayout/><w:compatSetting w:name="compatibilityMode" w:uri="http://schemas.microsoft.com/office/word" w:val="15"/></w:compat>"#,
            r#"<w:rsids><w:rsidRoot w:val="00A1"/><w:rsid w:val="00A1"/><w:rsid w:val="00B2"/></w:rsids>"#,
        ))
        .theme(concat!(
            r#"<a:themeElements><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/>"#,
            r#"<a:font script="Arab" typeface="Times New Roman"/><a:font script="Thai" typeface="Tahoma"/>"#,
            r#"</a:majorFont></a:fontScheme></a:themeElements>"#,
        ))
        .rel("rId6", rel_types::IMAGE, "media/image1.png")
        .rel("rId7", rel_types::IMAGE, "media/image2.png")
        .external_rel("rId8", rel_types::HYPERLINK, "https://www.tracker.example/click?id=1")
        .part("/word/media/image1.png", "image/png", vec![1, 2, 3])
        .part("/word/media/image2.png", "image/png", vec![4, 5, 6, 7])
}

fn config() -> SweepConfig {
    SweepConfig::default()
        .mode(Mode::Apply)
        .link_domain("tracker.example")
        .protected(ProtectedConfig {
            styles: vec!["Quote".into()],
            ..ProtectedConfig::default()
        })
}

#[test]
fn test_every_category_is_found() {
    init_logging();
    let pkg = cluttered().build();
    let analysis = Sweeper::new(config()).unwrap().analyze(&pkg).unwrap();

    let found: Vec<Category> = analysis.plan.counts().into_keys().collect();
    assert_eq!(
        found,
        vec![
            Category::OrphanRelationship,
            Category::OrphanMedia,
            Category::OrphanStyle,
            Category::Rsid,
            Category::EmptyElement,
            Category::LocaleFont,
            Category::CompatSetting,
            Category::Bookmark,
            Category::ProofState,
            Category::ExternalLinkDomain,
        ]
    );
    let styles: Vec<&str> = analysis
        .plan
        .by_category(Category::OrphanStyle)
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(styles, vec!["Ghost", "TB4"]);
}

#[test]
fn test_second_run_finds_nothing() {
    init_logging();
    let sweeper = Sweeper::new(config()).unwrap();
    let first = sweeper.run(cluttered().build()).unwrap();
    assert!(!first.manifest.is_empty());

    let second = sweeper.analyze(&first.package).unwrap();
    assert_eq!(second.plan.len(), 0, "{}", second.manifest);

    let doc = part_xml(&first.package, "/word/document.xml");
    assert!(doc.contains("tracked"));
    assert!(!doc.contains("w:hyperlink"));
    assert!(!first.package.contains(&uri("/word/media/image2.png")));
    assert!(first.package.contains(&uri("/word/media/image1.png")));
}

#[test]
fn test_protected_resources_survive_any_toggles() {
    init_logging();
    let mut toggles = vec![CategorySet::all(), CategorySet::none()];
    toggles.extend(Category::ALL.iter().map(|c| CategorySet::only(*c)));
    toggles.extend(Category::ALL.iter().map(|c| CategorySet::all().without(*c)));

    for categories in toggles {
        let sweeper = Sweeper::new(config().categories(categories.clone())).unwrap();
        let outcome = sweeper.run(cluttered().build()).unwrap();

        let styles = part_xml(&outcome.package, "/word/styles.xml");
        for id in ["Normal", "Heading1", "Quote"] {
            assert!(
                styles.contains(&format!(r#"w:styleId="{}""#, id)),
                "{} removed with {:?}",
                id,
                categories
            );
        }
        let doc = part_xml(&outcome.package, "/word/document.xml");
        assert!(doc.contains("Chapter1"), "user bookmark removed with {:?}", categories);

        let rels = outcome
            .package
            .part(&uri("/word/document.xml"))
            .unwrap()
            .relationships()
            .unwrap();
        assert!(rels.by_type(rel_types::STYLES).is_some());
        assert!(rels.by_type(rel_types::SETTINGS).is_some());
        assert!(rels.by_type(rel_types::THEME).is_some());
    }
}

#[test]
fn test_roots_live_and_edges_closed() {
    init_logging();
    let pkg = cluttered().build();
    let parsed = ParsedPackage::new(&pkg);
    let graph = Graph::build(&parsed);
    let protected = ProtectedSet::new(&ProtectedConfig::default());
    let reach = Reachability::compute(&graph, &protected);

    assert!(graph.roots().iter().all(|root| reach.is_live(*root)));
    for edge in graph.edges() {
        assert!(!reach.is_live(edge.from) || reach.is_live(edge.to));
    }
    let orphans = reach.orphans(&graph, &protected);
    assert!(orphans.iter().all(|o| !graph.roots().contains(&o.node)));
}

#[test]
fn test_failed_validation_leaves_identical_bytes() {
    init_logging();
    let mut pkg = cluttered().build();
    let before = pkg.to_bytes().unwrap();

    let mut plan = RemovalPlan::new();
    plan.push(Finding {
        category: Category::OrphanMedia,
        part: uri("/word/document.xml"),
        actions: vec![Action::RemovePart],
        kind: "part".into(),
        id: "/word/document.xml".into(),
        detail: String::new(),
        reason: String::new(),
        bytes: 0,
        resource: None,
    });

    let err = executor::apply(&mut pkg, &plan).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "{}", err);
    assert_eq!(pkg.to_bytes().unwrap(), before);
}

#[test]
fn test_broken_part_does_not_stop_the_run() {
    init_logging();
    let pkg = DocxBuilder::new()
        .body(concat!(
            r#"<w:p w:rsidR="00C3"><w:r><w:t>x</w:t></w:r></w:p>"#,
            r#"<w:sectPr><w:headerReference w:type="default" r:id="rId20"/></w:sectPr>"#,
        ))
        .styles(STYLES)
        .rel("rId20", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header", "header1.xml")
        .external_rel("rId21", rel_types::HYPERLINK, "https://example.com/")
        .part("/word/header1.xml", HEADER, b"<w:hdr><w:p><w:pStyle w:val=\"Ghost\"></w:hdr>".to_vec())
        .build();
    let header_before = pkg.part(&uri("/word/header1.xml")).unwrap().data().to_vec();

    let sweeper = Sweeper::new(config()).unwrap();
    let analysis = sweeper.analyze(&pkg).unwrap();
    assert!(analysis
        .issues
        .iter()
        .any(|e| matches!(e, Error::PartParse { part, .. } if part == "/word/header1.xml")));

    let counts = analysis.plan.counts();
    assert_eq!(counts.get(&Category::Rsid), Some(&1));
    assert_eq!(counts.get(&Category::OrphanRelationship), Some(&1));
    // The broken header might use any style
    assert_eq!(counts.get(&Category::OrphanStyle), None);

    let outcome = sweeper.run(pkg).unwrap();
    assert_eq!(
        outcome.package.part(&uri("/word/header1.xml")).unwrap().data(),
        header_before.as_slice()
    );
}

#[test]
fn test_same_bookmark_name_in_two_stories() {
    init_logging();
    let header = format!(
        r#"<w:hdr {}><w:p><w:bookmarkStart w:id="1" w:name="_Toc5"/><w:r><w:t>h</w:t></w:r><w:bookmarkEnd w:id="1"/></w:p></w:hdr>"#,
        common::NS
    );
    let pkg = DocxBuilder::new()
        .body(concat!(
            r#"<w:p><w:bookmarkStart w:id="0" w:name="_Toc5"/><w:r><w:t>a</w:t></w:r><w:bookmarkEnd w:id="0"/></w:p>"#,
            r#"<w:sectPr><w:headerReference w:type="default" r:id="rId20"/></w:sectPr>"#,
        ))
        .rel("rId20", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header", "header1.xml")
        .part("/word/header1.xml", HEADER, header.into_bytes())
        .build();

    let sweeper = Sweeper::new(SweepConfig::default().mode(Mode::Apply)).unwrap();
    let analysis = sweeper.analyze(&pkg).unwrap();
    let parts: Vec<&str> = analysis
        .plan
        .by_category(Category::Bookmark)
        .map(|i| i.part.as_str())
        .collect();
    assert_eq!(parts, vec!["/word/document.xml", "/word/header1.xml"]);

    let outcome = sweeper.run(pkg).unwrap();
    assert!(!part_xml(&outcome.package, "/word/document.xml").contains("_Toc5"));
    assert!(!part_xml(&outcome.package, "/word/header1.xml").contains("_Toc5"));
    assert_eq!(sweeper.analyze(&outcome.package).unwrap().plan.len(), 0);
}
