use std::path::PathBuf;

use xml_arbor::name::XML_NAMESPACE;
use xml_arbor::tree::{NamespaceMatch, NodeKind, TokenType};
use xml_arbor::{Document, Error, NodeId, Reader};

use pretty_assertions::assert_eq;

const ATOM: &str = "http://www.w3.org/2005/Atom";
const MEDIA: &str = "http://search.yahoo.com/mrss/";

fn element_children(doc: &Document, id: NodeId) -> Vec<NodeId> {
    doc.children(id)
        .iter()
        .copied()
        .filter(|&c| doc.element(c).is_some())
        .collect()
}

#[test]
fn sample_file() {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/documents/sample.xml");
    let doc = Reader::new().read_file(path).unwrap();

    let feed = doc.root().unwrap();
    assert_eq!(doc.namespace(feed), Some(ATOM));
    assert_eq!(
        doc.attribute(feed, "lang", NamespaceMatch::Uri(XML_NAMESPACE)),
        Some("en")
    );
    assert_eq!(doc.namespace_prefix(feed, MEDIA), Some("media"));

    let title = doc.child(feed, "title", NamespaceMatch::Uri(ATOM), 0).unwrap();
    assert_eq!(doc.text(title, 0), Some("Arbor & Friends"));
    assert_eq!(doc.attribute(title, "type", NamespaceMatch::Unqualified), Some("text"));

    let first = doc.child(feed, "entry", NamespaceMatch::Any, 0).unwrap();
    let title = doc.child(first, "title", NamespaceMatch::Any, 0).unwrap();
    assert_eq!(doc.text(title, 0), Some("First <post>"));
    let thumbnail = doc.child(first, "thumbnail", NamespaceMatch::Uri(MEDIA), 0).unwrap();
    assert_eq!(doc.namespace(thumbnail), Some(MEDIA));
    assert_eq!(
        doc.attribute(thumbnail, "url", NamespaceMatch::Unqualified),
        Some("http://example.com/1.png")
    );
    let content = doc.child(first, "content", NamespaceMatch::Uri(ATOM), 0).unwrap();
    assert_eq!(doc.text(content, 0), Some("<p>Hello, <b>world</b></p>"));

    let second = doc.child(feed, "entry", NamespaceMatch::Uri(ATOM), 1).unwrap();
    let title = doc.child(second, "title", NamespaceMatch::Uri(ATOM), 0).unwrap();
    assert_eq!(doc.text(title, 0), Some("Second \u{2014} post"));
    let content = doc.child(second, "content", NamespaceMatch::Any, 0).unwrap();
    assert_eq!(doc.text(content, 0), Some("Plain \u{a9} text"));

    let third = doc.child(feed, "entry", NamespaceMatch::Any, 2).unwrap();
    assert_eq!(doc.child(third, "thumbnail", NamespaceMatch::Any, 0), None);
    assert_eq!(doc.child(third, "title", NamespaceMatch::Uri(ATOM), 0), None);
    let title = doc.child(third, "title", NamespaceMatch::Unqualified, 0).unwrap();
    assert_eq!(doc.namespace(title), None);
    let content = doc.child(third, "content", NamespaceMatch::Any, 0).unwrap();
    assert_eq!(doc.text(content, 0), Some("Third\n      entry"));

    assert_eq!(doc.child(feed, "entry", NamespaceMatch::Any, 3), None);
}

#[test]
fn whitespace() {
    let xml = "<doc>\r\n   <clean>   </clean>\r\n   <dirty>   A   B   </dirty>\r\n</doc>\r\n";

    let doc = Reader::new().parse_str(xml).unwrap();
    let root = doc.root().unwrap();
    let children = element_children(&doc, root);
    assert_eq!(doc.children(root).len(), 2);
    assert!(doc.children(children[0]).is_empty());
    assert_eq!(doc.text(children[1], 0), Some("   A   B   "));

    let doc = Reader::builder().keep_whitespace(true).build().parse_str(xml).unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.children(root).len(), 5);
    assert_eq!(doc.text(root, 0), Some("\n   "));
    let clean = element_children(&doc, root)[0];
    assert_eq!(doc.text(clean, 0), Some("   "));
}

#[test]
fn attributes() {
    let doc = Reader::new()
        .parse_str("<element foo='blabla'><cc1 attr1='0'/></element>")
        .unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.attribute(root, "foo", NamespaceMatch::Unqualified), Some("blabla"));
    let cc1 = doc.child(root, "cc1", NamespaceMatch::Unqualified, 0).unwrap();
    assert_eq!(doc.attribute(cc1, "attr1", NamespaceMatch::Any), Some("0"));
}

#[test]
fn attribute_normalization() {
    let xml = "<x a='\n\n xyz abc &#xD; &#xA; &#x9; &#x20; 12\r\n3\r4\n5 6  '/>";
    let doc = Reader::new().parse_str(xml).unwrap();
    assert_eq!(
        doc.attribute(doc.root().unwrap(), "a", NamespaceMatch::Unqualified),
        Some("   xyz abc \r \n \t   12 3 4 5 6  ")
    );
}

#[test]
fn entities() {
    let doc = Reader::new()
        .parse_str("<a v='&quot;&apos;&#65;'>&lt;&gt;&amp;&#x41;&#66;&unknown;</a>")
        .unwrap();
    let a = doc.root().unwrap();
    assert_eq!(doc.attribute(a, "v", NamespaceMatch::Any), Some("\"'A"));
    assert_eq!(doc.text(a, 0), Some("<>&AB&unknown;"));

    for bad in ["<a>&#xD800;</a>", "<a>&#1114112;</a>", "<a>&#xZZ;</a>"] {
        match Reader::new().parse_str(bad) {
            Err(Error::InvalidSyntax(_)) => {}
            x => panic!("expected Error::InvalidSyntax for {}, got {:?}", bad, x),
        }
    }
}

#[test]
fn comments_and_cdata_are_text() {
    let doc = Reader::new()
        .parse_str(
            "<!-- comment outside the element -->\n\
             <doc> blabla <!-- --> foo <!-- you <g> &foo -> &bar --> blibli</doc>",
        )
        .unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.children(root).len(), 1);
    assert_eq!(doc.text(root, 0), Some(" blabla  foo  blibli"));

    let doc = Reader::new()
        .parse_str("<doc> blabla <![CDATA[  < [[  Smith ]] >   ]]> blibli</doc>")
        .unwrap();
    let root = doc.root().unwrap();
    let text = doc.node(doc.children(root)[0]);
    match text.kind() {
        NodeKind::Text(t) => {
            assert_eq!(t.token(), TokenType::CharacterData);
            assert_eq!(t.as_str(), " blabla   < [[  Smith ]] >    blibli");
        }
        x => panic!("expected a text node, got {:?}", x),
    }
}

#[test]
fn prolog() {
    let xml = "\u{feff}<?xml version='1.0'?>\n\
               <!DOCTYPE r [ <!ENTITY e 'x'> ]>\n\
               <?pi data?>\n\
               <r/>";
    let doc = Reader::new().parse_str(xml).unwrap();
    assert_eq!(doc.element(doc.root().unwrap()).unwrap().tag(), "r");
}

#[test]
fn finders() {
    let xml = "<a b='foo' c='bar' ns:b='bla' ns:d='123' xmlns:ns='ns-uri' xmlns:ns1='ns1-uri' \
               xmlns:ns2='ns2-uri' xmlns:ns3='ns3-uri'>\
               <b xmlns='ns4-uri' ba='123' ns2:bo='345'></b>\
               <b ba='123' ns2:bo='345'></b>\
               <ns2:b></ns2:b>\
               <ns1:b></ns1:b>\
               </a>";
    let doc = Reader::new().parse_str(xml).unwrap();
    let a = doc.root().unwrap();
    let children = doc.children(a).to_vec();

    assert_eq!(doc.attribute(a, "d", NamespaceMatch::Unqualified), None);
    assert_eq!(doc.attribute(a, "b", NamespaceMatch::Unqualified), Some("foo"));
    assert_eq!(doc.attribute(a, "b", NamespaceMatch::Uri("ns-uri")), Some("bla"));
    assert_eq!(doc.attribute(a, "c", NamespaceMatch::Any), Some("bar"));
    assert_eq!(doc.attribute(a, "b", NamespaceMatch::Any), Some("foo"));
    assert_eq!(doc.attribute(a, "b", NamespaceMatch::Uri("boubou")), None);
    assert_eq!(doc.attribute(a, "d", NamespaceMatch::Uri("")), None);
    assert_eq!(doc.attribute(a, "d", NamespaceMatch::Any), Some("123"));

    let child = doc.child(a, "b", NamespaceMatch::Unqualified, 0).unwrap();
    assert_eq!(child, children[1]);
    assert_eq!(doc.attribute(child, "ba", NamespaceMatch::Unqualified), Some("123"));

    let child = doc.child(a, "b", NamespaceMatch::Uri("ns4-uri"), 0).unwrap();
    assert_eq!(child, children[0]);
    assert_eq!(doc.attribute(child, "ba", NamespaceMatch::Uri("ns4-uri")), None);
    assert_eq!(doc.attribute(child, "bo", NamespaceMatch::Any), Some("345"));
    assert_eq!(doc.attribute(child, "bo", NamespaceMatch::Unqualified), None);
    assert_eq!(doc.attribute(child, "bo", NamespaceMatch::Uri("foo")), None);
    assert_eq!(doc.attribute(child, "bo", NamespaceMatch::Uri("ns2-uri")), Some("345"));

    let child = doc.child(a, "b", NamespaceMatch::Any, 0).unwrap();
    assert_eq!(doc.namespace(child), Some("ns4-uri"));
    let child = doc.child(a, "b", NamespaceMatch::Uri("ns2-uri"), 0).unwrap();
    assert_eq!(child, children[2]);
    assert_eq!(doc.namespace(child), Some("ns2-uri"));
    assert_eq!(doc.child(a, "b", NamespaceMatch::Any, 3), Some(children[3]));
    assert_eq!(doc.child(a, "b", NamespaceMatch::Uri("boubou"), 0), None);
}

#[test]
fn namespaces_built_by_hand() {
    let mut doc = Document::new();
    let top = doc.create_element("top");
    doc.set_root(top).unwrap();
    doc.set_namespace_uri(top, "", "http://namespace1.com").unwrap();
    assert_eq!(doc.namespace_uri(top, ""), Some("http://namespace1.com"));

    let child1 = doc.create_element("child1");
    doc.append_child(top, child1).unwrap();
    assert_eq!(doc.namespace_uri(child1, ""), Some("http://namespace1.com"));

    let child2 = doc.create_element_with_prefix("ns1", "child2");
    doc.append_child(top, child2).unwrap();
    assert_eq!(doc.namespace_uri(child2, ""), Some("http://namespace1.com"));
    assert_eq!(doc.namespace_uri(child2, "ns1"), None);
    doc.set_namespace_uri(child2, "ns1", "http://blabla").unwrap();
    assert_eq!(doc.namespace_uri(child2, "ns1"), Some("http://blabla"));
    assert_eq!(doc.namespace(child2), Some("http://blabla"));

    // prefix declared on the parent
    let child3 = doc.create_element("ns1:child3");
    doc.append_child(child2, child3).unwrap();
    assert_eq!(doc.namespace_uri(child3, ""), Some("http://namespace1.com"));
    assert_eq!(doc.namespace_uri(child3, "ns1"), Some("http://blabla"));
    assert_eq!(doc.namespace(child3), Some("http://blabla"));

    // a local declaration does not hide the inherited ones
    doc.set_namespace_uri(child3, "ns3", "http://foofoo").unwrap();
    assert_eq!(doc.namespace_uri(child3, "ns1"), Some("http://blabla"));
    assert_eq!(doc.namespace(child3), Some("http://blabla"));
    assert_eq!(doc.namespace_uri(child3, "ns3"), Some("http://foofoo"));
    assert_eq!(doc.namespace_uri(child2, "ns3"), None);
}

#[test]
fn namespaces_while_parsing() {
    let xml = "<top>\
               <child1 xmlns:foo='blabla'><cc1 foo:attr1='0'/></child1>\
               <child2 xmlns='foobar' attr1='1'><cc2/><cc3 /></child2 >\
               <ns2:child3 xmlns:ns2='abcd'><cc3/></ns2:child3>\
               <child4 ns3:attr1='3' xmlns:ns3='efgh'><ns3:cc4 ns3:attr1='4'/></child4>\
               </top>";
    let doc = Reader::new().parse_str(xml).unwrap();
    let top = doc.root().unwrap();
    let c = doc.children(top).to_vec();

    let cc1 = doc.children(c[0])[0];
    assert_eq!(doc.attribute(cc1, "attr1", NamespaceMatch::Uri("blabla")), Some("0"));
    let cc2 = doc.children(c[1])[0];
    assert_eq!(doc.namespace(cc2), Some("foobar"));
    let cc3 = doc.children(c[2])[0];
    assert_eq!(doc.namespace(c[2]), Some("abcd"));
    assert_eq!(doc.namespace(cc3), None);
    // declared after the attribute that uses it
    assert_eq!(doc.attribute(c[3], "attr1", NamespaceMatch::Uri("efgh")), Some("3"));
    let cc4 = doc.children(c[3])[0];
    assert_eq!(doc.namespace(cc4), Some("efgh"));
}

#[test]
fn default_and_empty_namespaces() {
    let doc = Reader::new()
        .parse_str("<top><a></a><b xmlns='foo'><c xmlns=''></c></b></top>")
        .unwrap();
    let top = doc.root().unwrap();
    let a = doc.children(top)[0];
    let b = doc.children(top)[1];
    let c = doc.children(b)[0];
    assert_eq!(doc.namespace(top), None);
    assert_eq!(doc.namespace(a), None);
    assert_eq!(doc.namespace(b), Some("foo"));
    assert_eq!(doc.namespace(c), None);
}

#[test]
fn attributes_set_by_hand() {
    let mut doc = Document::new();
    let hello = doc.create_element("hello");
    doc.set_attribute(hello, "ns", "foo", "6").unwrap();
    doc.set_attribute(hello, "", "foo", "5").unwrap();
    doc.set_attribute(hello, "ns", "foo", "7").unwrap();
    doc.set_attribute(hello, "", "foo", "8").unwrap();
    doc.set_namespace_uri(hello, "ns", "blabla").unwrap();

    assert_eq!(doc.element(hello).unwrap().attributes().len(), 2);
    assert_eq!(doc.attribute(hello, "foo", NamespaceMatch::Unqualified), Some("8"));
    assert_eq!(doc.attribute(hello, "foo", NamespaceMatch::Uri("blabla")), Some("7"));
}

#[test]
fn bad_input() {
    let mut reader = Reader::new();
    match reader.parse_str("<top1></top1><top2></top2>") {
        Err(Error::MultipleRoots) => {}
        x => panic!("expected Error::MultipleRoots, got {:?}", x),
    }
    match reader.parse_str("<top><a></b></top>") {
        Err(Error::TagMismatch { expected, found }) => {
            assert_eq!(expected, "a");
            assert_eq!(found, "b");
        }
        x => panic!("expected Error::TagMismatch, got {:?}", x),
    }
    match reader.parse_str("<top") {
        Err(Error::NoRoot) => {}
        x => panic!("expected Error::NoRoot, got {:?}", x),
    }
    match reader.parse_str("<top a=1/>") {
        Err(Error::InvalidSyntax(_)) => {}
        x => panic!("expected Error::InvalidSyntax, got {:?}", x),
    }
    match reader.parse(b"<top>\xFF\xFE</top>") {
        Err(Error::NonDecodable(_)) => {}
        x => panic!("expected Error::NonDecodable, got {:?}", x),
    }
}

#[test]
fn chunk_boundaries_do_not_matter() {
    let xml = "<a xmlns:p='urn:p'>\r\n<p:b k='&amp;v'>x&lt;y</p:b><![CDATA[]]]]><c/></a>";
    let whole = Reader::new().parse_str(xml).unwrap();

    for size in 1..xml.len() {
        let mut reader = Reader::new();
        let mut doc = None;
        for chunk in xml.as_bytes().chunks(size) {
            assert!(doc.is_none());
            doc = reader.feed(chunk).unwrap();
        }
        assert_eq!(doc.as_ref(), Some(&whole), "chunk size {}", size);
    }
}
