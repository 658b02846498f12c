//! Tree assembly: generate the data chunks, instantiate manifest nodes at
//! their sized capacity, link them into a k-ary tree in depth-first
//! pre-order, renumber them by breadth-first traversal, then fold the tree
//! bottom-up into signed wire content objects.
//!
//! Ported from the reference builder's `create_tree`: `_generate_data`,
//! `__generate_manifests`, `__link_manifests` /
//! `__recursive_pre_order`, and `__bfs_rename`. The reference implementation
//! mutates a graph of `CCNxManifest` objects in place; here each node is an
//! arena index so the builder never needs a child to hold a reference back
//! into its own arena (see spec.md's "Cyclic references" design note).

use std::collections::VecDeque;

use ccnx_tlv::Name;
use ccnx_wire::message::{ContentObject, LinkSection, Manifest, Message};
use ccnx_wire::Signer;

use crate::sizing::{self, ManifestStructure};
use crate::Result;

/// One slot in the manifest arena: structural links only (child indices and
/// already-hashed data links) — wire content objects are materialized once
/// per node during the bottom-up finalize pass, after BFS renaming has fixed
/// every node's chunk number.
struct Node {
    /// Chunk number this node will carry once finalized; starts as the
    /// sequential build order, overwritten by `bfs_rename`.
    chunk_number: u64,
    manifest_fanout_capacity: usize,
    data_fanout_capacity: usize,
    /// Arena indices of child manifest nodes, in traversal order.
    manifest_links: Vec<usize>,
    /// Hashes of the data objects this node points to directly, in
    /// ascending chunk-number order.
    data_links: Vec<(u64, [u8; 32])>,
}

impl Node {
    fn new(chunk_number: u64, structure: ManifestStructure) -> Self {
        Node {
            chunk_number,
            manifest_fanout_capacity: structure.manifest_fanout,
            data_fanout_capacity: structure.data_fanout,
            manifest_links: Vec::new(),
            data_links: Vec::new(),
        }
    }

    fn remaining_manifest_fanout(&self) -> usize {
        self.manifest_fanout_capacity - self.manifest_links.len()
    }
}

/// Builds a signed manifest tree over `data`, rooted at `prefix`, with no
/// content object exceeding `chunk_size` bytes.
pub struct ManifestTree {
    prefix: Name,
    data: Vec<u8>,
    chunk_size: usize,
}

impl ManifestTree {
    pub fn new(prefix: Name, data: Vec<u8>, chunk_size: usize) -> Self {
        ManifestTree { prefix, data, chunk_size }
    }

    /// Generates the whole tree: every manifest (root signed, the rest
    /// not, per spec) followed by every data chunk, in an order a
    /// publisher can insert directly into a content store. The root is
    /// always first (chunk number 0); a consumer asking for chunk 0 by
    /// name gets it and can walk the rest via `manifest_links`/`data_links`.
    pub fn create_tree(&self, signer: &Signer) -> Result<Vec<ContentObject>> {
        let (manifest_count, _chunk_count, root_structure, internal_structure) =
            sizing::calculate_manifest_count(self.chunk_size, self.data.len(), &self.prefix, signer)?;

        let data_objects = self.generate_data(manifest_count);
        let data_hashes: Vec<[u8; 32]> = data_objects
            .iter()
            .map(|co| Message::ContentObject(co.clone()).content_object_hash())
            .collect();

        let mut nodes = self.generate_manifest_nodes(
            manifest_count,
            &data_objects,
            &data_hashes,
            root_structure,
            internal_structure,
        );
        self.link_manifests(&mut nodes, root_structure, internal_structure);
        bfs_rename(&mut nodes);

        let mut finalized: Vec<Option<ContentObject>> = vec![None; nodes.len()];
        finalize_all(0, &nodes, &self.prefix, &mut finalized);
        let mut manifest_objects: Vec<ContentObject> =
            finalized.into_iter().map(|co| co.expect("every node is reachable from the root")).collect();

        signer.sign_content_object(&mut manifest_objects[0])?;

        manifest_objects.extend(data_objects);
        Ok(manifest_objects)
    }

    /// Builds the `chunk_count` data content objects, numbered starting at
    /// `manifest_count` (manifests occupy `[0, manifest_count)`). Every data
    /// object shares one expiry timestamp 24 hours out.
    fn generate_data(&self, manifest_count: u64) -> Vec<ContentObject> {
        let per_chunk = sizing::data_bytes_per_chunk(self.chunk_size, &self.prefix)
            .expect("chunk size already validated by calculate_manifest_count");
        let expiry = ccnx_util::now_millis() + 24 * 3600 * 1000;

        let mut chunks = Vec::new();
        let mut offset = 0usize;
        let mut chunk_number = manifest_count;
        while offset < self.data.len() {
            let end = (offset + per_chunk).min(self.data.len());
            let name = Name::from_name_with_chunk(&self.prefix, chunk_number);
            chunks.push(ContentObject::new(
                name,
                Some(expiry),
                Some(self.data[offset..end].to_vec()),
                None,
            ));
            chunk_number += 1;
            offset = end;
        }
        chunks
    }

    /// Instantiates `manifest_count` nodes and fills each with up to its
    /// data fanout's worth of data links, in order — the reference
    /// builder's `__generate_manifests`.
    fn generate_manifest_nodes(
        &self,
        manifest_count: u64,
        data_objects: &[ContentObject],
        data_hashes: &[[u8; 32]],
        root_structure: ManifestStructure,
        internal_structure: ManifestStructure,
    ) -> Vec<Node> {
        let mut nodes = Vec::with_capacity(manifest_count as usize);
        let mut data_index = 0usize;

        for manifest_chunk_number in 0..manifest_count {
            let structure = if manifest_chunk_number == 0 { root_structure } else { internal_structure };
            let mut node = Node::new(manifest_chunk_number, structure);
            while node.data_links.len() < structure.data_fanout && data_index < data_objects.len() {
                let chunk_number = data_objects[data_index].name.chunk_number().expect("data object has a chunk number");
                node.data_links.push((chunk_number, data_hashes[data_index]));
                data_index += 1;
            }
            nodes.push(node);
        }
        nodes
    }

    /// Links nodes 1.. under the root in depth-first pre-order, branching
    /// the root's `manifest_fanout` children into roughly equal-sized
    /// subtrees of the internal fanout — the reference builder's
    /// `__link_manifests`.
    fn link_manifests(&self, nodes: &mut [Node], root_structure: ManifestStructure, internal_structure: ManifestStructure) {
        let n = nodes.len().saturating_sub(1);
        if n == 0 || root_structure.manifest_fanout == 0 {
            return;
        }
        let nodes_per_branch = div_roundup(n, root_structure.manifest_fanout);
        let k = internal_structure.manifest_fanout.max(2);
        let branch_height = if nodes_per_branch > 0 {
            (((k as f64 - 1.0).log(k as f64) + (nodes_per_branch as f64).log(k as f64)) - 1.0).ceil() as i64
        } else {
            0
        };
        let branch_height = branch_height.max(0) as usize;
        recursive_pre_order(nodes, 0, branch_height);
    }
}

fn div_roundup(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Depth-first pre-order fill: attach as many direct children as
/// `manifest_start_index` has nodes left and the current node still has
/// fanout capacity for, recursing one level shallower per child, exactly
/// mirroring the reference `__recursive_pre_order`.
fn recursive_pre_order(nodes: &mut [Node], manifest_start_index: usize, remaining_height: usize) -> usize {
    let mut next_index = manifest_start_index + 1;
    if remaining_height > 0 {
        loop {
            if nodes[manifest_start_index].remaining_manifest_fanout() == 0 || next_index >= nodes.len() {
                break;
            }
            let child_index = next_index;
            nodes[manifest_start_index].manifest_links.push(child_index);
            next_index = recursive_pre_order(nodes, child_index, remaining_height - 1);
        }
    }
    next_index
}

/// Renumbers every manifest's `chunk_number` by a breadth-first walk
/// starting at the root (chunk 0) — the final published numbering.
fn bfs_rename(nodes: &mut [Node]) {
    let mut chunk_number = 0u64;
    let mut queue = VecDeque::new();
    queue.push_back(0usize);
    while let Some(index) = queue.pop_front() {
        nodes[index].chunk_number = chunk_number;
        chunk_number += 1;
        for &child in &nodes[index].manifest_links {
            queue.push_back(child);
        }
    }
}

/// Folds the arena into wire content objects bottom-up: a node's manifest
/// links need its children's content-object hashes, so every child is
/// finalized (and hashed) before its parent. Every node visited is also
/// recorded in `out` at its own arena index, so the caller gets the whole
/// tree's content objects, not just the root's.
fn finalize_all(index: usize, nodes: &[Node], prefix: &Name, out: &mut [Option<ContentObject>]) -> ContentObject {
    if let Some(co) = &out[index] {
        return co.clone();
    }

    let node = &nodes[index];
    let manifest_links: Vec<(u64, [u8; 32])> = node
        .manifest_links
        .iter()
        .map(|&child_index| {
            let child_co = finalize_all(child_index, nodes, prefix, out);
            let chunk_number = nodes[child_index].chunk_number;
            let hash = Message::ContentObject(child_co).content_object_hash();
            (chunk_number, hash)
        })
        .collect();

    let manifest = Manifest {
        manifest_links: link_section(&manifest_links),
        data_links: link_section(&node.data_links),
    };

    let name = Name::from_name_with_chunk(prefix, node.chunk_number);
    let co = ContentObject::new(name, None, None, Some(manifest));
    out[index] = Some(co.clone());
    co
}

fn link_section(links: &[(u64, [u8; 32])]) -> LinkSection {
    let start_chunk = links.first().map(|(c, _)| *c).unwrap_or(0);
    let hashes = links.iter().map(|(_, h)| *h).collect();
    LinkSection::new(start_chunk, hashes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer() -> Signer {
        use pkcs8::EncodePrivateKey;
        use rsa::RsaPrivateKey;

        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let pem = private_key.to_pkcs8_pem(Default::default()).expect("pkcs8 encode").to_string();
        Signer::from_pkcs8_pem(&pem).expect("signer load")
    }

    /// Reproduces scenario 4: a hand-built forest with root fanout 2 and
    /// internal fanout 3, 18 manifests labeled A..R, linked via
    /// `recursive_pre_order` at height 3. A pre-order walk of the resulting
    /// `manifest_links` must read A B C D E F G H I J K L M N O P Q R.
    #[test]
    fn recursive_pre_order_matches_scenario_4() {
        let labels: Vec<char> = ('A'..='R').collect();
        let mut nodes: Vec<Node> = labels
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let fanout = if i == 0 { 2 } else { 3 };
                Node::new(i as u64, ManifestStructure { manifest_fanout: fanout, data_fanout: 10 })
            })
            .collect();

        recursive_pre_order(&mut nodes, 0, 3);

        let mut visited = Vec::new();
        fn walk(nodes: &[Node], index: usize, labels: &[char], visited: &mut Vec<char>) {
            visited.push(labels[index]);
            for &child in &nodes[index].manifest_links {
                walk(nodes, child, labels, visited);
            }
        }
        walk(&nodes, 0, &labels, &mut visited);

        assert_eq!(visited, labels);
    }

    #[test]
    fn small_tree_round_trips_all_bytes() {
        let name = Name::from_uri("lci:/apple/pie").unwrap();
        let data = vec![7u8; 2000];
        let tree = ManifestTree::new(name.clone(), data.clone(), 700);
        let signer = test_signer();
        let objects = tree.create_tree(&signer).unwrap();
        let root = &objects[0];
        assert!(root.is_signed());
        assert!(root.manifest.is_some());
        assert_eq!(root.name, Name::from_name_with_chunk(&name, 0));

        let total_links: usize = root.manifest.as_ref().unwrap().data_links.hashes.len()
            + root.manifest.as_ref().unwrap().manifest_links.hashes.len();
        assert!(total_links > 0);

        let total_payload: usize = objects.iter().filter_map(|co| co.payload.as_ref()).map(|p| p.len()).sum();
        assert_eq!(total_payload, data.len());
    }

    #[test]
    fn single_chunk_payload_is_one_manifest_one_data_link() {
        let name = Name::from_uri("lci:/a").unwrap();
        let data = vec![1u8; 10];
        let tree = ManifestTree::new(name, data, 1500);
        let signer = test_signer();
        let objects = tree.create_tree(&signer).unwrap();
        let root = &objects[0];
        let manifest = root.manifest.as_ref().unwrap();
        assert_eq!(manifest.data_links.hashes.len(), 1);
        assert_eq!(manifest.manifest_links.hashes.len(), 0);
        assert_eq!(objects.len(), 2);
    }

    #[test]
    fn manifest_count_matches_scenario_5_object_count() {
        let name = Name::from_uri("lci:/apple/bananna").unwrap();
        let data = vec![3u8; 10000];
        let tree = ManifestTree::new(name, data, 700);
        let signer = test_signer();
        let objects = tree.create_tree(&signer).unwrap();
        let manifest_count = objects.iter().filter(|co| co.manifest.is_some()).count();
        assert_eq!(manifest_count, 3);
    }
}
