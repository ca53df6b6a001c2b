//! Counted-collection wrapper reconciler.
//!
//! A wrapper is a wire struct holding one slice, a `Quantity` count and, for
//! Rule 2 wrappers, sibling fields. On the domain side it pairs with either a
//! plain collection (the sequence only) or a block: an object whose fields
//! feed the sequence and the siblings.

use std::collections::BTreeSet;
use std::sync::Arc;

use structflex_core::{
    ConversionError, Diagnostics, DomainObject, DomainStruct, DomainType, DomainValue, HookContext,
    Known, Path, WireObject, WireStruct, WireType, WireValue,
};

use crate::schema::{StructSchema, WrapperShape};
use crate::walker::{count_value, peel, place, take_struct, FieldOpts, Walker};

/// How a domain type pairs with a wrapper.
enum WrapperMode {
    /// An object, or a collection of objects, holding the sequence field.
    Block(Arc<DomainStruct>),
    /// A plain collection feeding the sequence directly.
    Collection,
}

impl Walker<'_> {
    fn wrapper_mode(&self, ty: &DomainType, shape: &WrapperShape) -> Option<WrapperMode> {
        if let Some(def) = ty.object_def() {
            let schema = self.engine.schemas.domain(def);
            if self.find_field(&shape.sequence, &schema).is_some() {
                return Some(WrapperMode::Block(def.clone()));
            }
        }
        match ty {
            DomainType::Object(_) => None,
            DomainType::List(_) | DomainType::Set(_) => Some(WrapperMode::Collection),
            _ => None,
        }
    }

    /// Externalize `src` into a wrapper target.
    ///
    /// `None` when the domain side does not pair with the wrapper, in which
    /// case the caller dispatches normally.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn externalize_wrapper(
        &self,
        src: &DomainValue,
        src_ty: &DomainType,
        sp: &Path,
        dst: &mut WireValue,
        dst_ty: &WireType,
        tp: &Path,
        opts: &FieldOpts,
        shape: &WrapperShape,
        depth: usize,
    ) -> Option<Diagnostics> {
        let mode = self.wrapper_mode(src_ty, shape)?;
        let (inner_ty, is_ptr) = peel(dst_ty);
        let def = inner_ty.struct_def()?.clone();
        let mut diags = Diagnostics::new();

        match mode {
            WrapperMode::Block(block_def) => {
                let (block, block_sp) = match src.known() {
                    Some(Known::Object(obj)) => (Some(obj), sp.clone()),
                    Some(Known::List(items) | Known::Set(items)) => {
                        if items.len() > 1 {
                            self.fail(
                                &mut diags,
                                sp,
                                tp,
                                ConversionError::IncompatibleTypes {
                                    source_type: src_ty.to_string(),
                                    target_type: dst_ty.to_string(),
                                    reason: format!("{} blocks for a single wrapper", items.len()),
                                },
                            );
                            return Some(diags);
                        }
                        (items.first().and_then(DomainValue::as_object), sp.at_index(0))
                    }
                    _ => (None, sp.clone()),
                };
                let Some(block) = block else {
                    self.null_wrapper(dst, &def, shape, opts, is_ptr);
                    return Some(diags);
                };

                let mut wrapper = take_struct(dst, &def);
                let block_schema = self.engine.schemas.domain(&block_def);
                if let Some(bi) = self.find_field(&shape.sequence, &block_schema) {
                    let field = &block_schema.fields[bi];
                    diags.append(self.fill_sequence(
                        &block.values()[bi],
                        &block_def.fields[bi].ty,
                        &block_sp.at_name(&field.declared_name),
                        &mut wrapper,
                        tp,
                        shape,
                        depth + 1,
                    ));
                }
                if !self.should_stop(&diags) {
                    diags.append(self.externalize_siblings(
                        block,
                        &block_schema,
                        &block_sp,
                        &mut wrapper,
                        tp,
                        shape,
                        depth + 1,
                    ));
                }
                place(dst, WireValue::Struct(wrapper), is_ptr);
            }
            WrapperMode::Collection => {
                if !src.is_known() {
                    self.null_wrapper(dst, &def, shape, opts, is_ptr);
                    return Some(diags);
                }
                let mut wrapper = take_struct(dst, &def);
                diags.append(self.fill_sequence(src, src_ty, sp, &mut wrapper, tp, shape, depth));
                place(dst, WireValue::Struct(wrapper), is_ptr);
            }
        }
        Some(diags)
    }

    /// Write the wrapper for an absent collection or block.
    fn null_wrapper(
        &self,
        dst: &mut WireValue,
        def: &Arc<WireStruct>,
        shape: &WrapperShape,
        opts: &FieldOpts,
        is_ptr: bool,
    ) {
        if opts.omitempty {
            if is_ptr {
                *dst = WireValue::Nil;
            }
            return;
        }
        let mut wrapper = WireObject::zero(def.clone());
        if let Some(i) = def.field_index(&shape.sequence) {
            wrapper.values_mut()[i] = WireValue::Slice(Vec::new());
        }
        if let Some(i) = def.field_index(&shape.count) {
            wrapper.values_mut()[i] = count_value(&def.fields[i].ty, 0);
        }
        place(dst, WireValue::Struct(wrapper), is_ptr);
    }

    /// Fill the sequence field from a collection and set the count.
    #[allow(clippy::too_many_arguments)]
    fn fill_sequence(
        &self,
        src: &DomainValue,
        src_ty: &DomainType,
        sp: &Path,
        wrapper: &mut WireObject,
        tp: &Path,
        shape: &WrapperShape,
        depth: usize,
    ) -> Diagnostics {
        let def = wrapper.def().clone();
        let (Some(si), Some(ci)) = (
            def.field_index(&shape.sequence),
            def.field_index(&shape.count),
        ) else {
            return Diagnostics::new();
        };

        let mut slot = WireValue::Nil;
        let diags = self.externalize_value(
            src,
            src_ty,
            sp,
            &mut slot,
            &def.fields[si].ty,
            &tp.at_name(&shape.sequence),
            &FieldOpts::default(),
            depth,
        );
        let items = match slot {
            WireValue::Slice(items) => items,
            _ => Vec::new(),
        };
        let count = count_value(&def.fields[ci].ty, items.len());
        wrapper.values_mut()[si] = WireValue::Slice(items);
        wrapper.values_mut()[ci] = count;
        diags
    }

    /// Feed each wrapper sibling from the block field it matches.
    #[allow(clippy::too_many_arguments)]
    fn externalize_siblings(
        &self,
        block: &DomainObject,
        block_schema: &StructSchema,
        sp: &Path,
        wrapper: &mut WireObject,
        tp: &Path,
        shape: &WrapperShape,
        depth: usize,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let def = wrapper.def().clone();
        let wire_schema = self.engine.schemas.wire(&def);
        for sibling in &shape.siblings {
            let (Some(wi), Some(bi)) = (
                def.field_index(sibling),
                self.find_field(sibling, block_schema),
            ) else {
                continue;
            };
            let bd = &block_schema.fields[bi];
            if bd.ignored {
                continue;
            }
            diags.append(self.externalize_value(
                &block.values()[bi],
                &block.def().fields[bi].ty,
                &sp.at_name(&bd.declared_name),
                &mut wrapper.values_mut()[wi],
                &def.fields[wi].ty,
                &tp.at_name(sibling),
                &FieldOpts::between(bd, &wire_schema.fields[wi]),
                depth,
            ));
            if self.should_stop(&diags) {
                break;
            }
        }
        diags
    }

    /// Internalize a wrapper source into `dst`.
    ///
    /// `None` when the domain side does not pair with the wrapper.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn internalize_wrapper(
        &self,
        src: &WireValue,
        src_ty: &WireType,
        sp: &Path,
        dst: &mut DomainValue,
        dst_ty: &DomainType,
        tp: &Path,
        opts: &FieldOpts,
        shape: &WrapperShape,
        depth: usize,
    ) -> Option<Diagnostics> {
        let mode = self.wrapper_mode(dst_ty, shape)?;
        let mut diags = Diagnostics::new();

        if src.deref().is_none() {
            *dst = DomainValue::Null;
            return Some(diags);
        }
        let Some(wrapper) = src.as_struct() else {
            self.fail(
                &mut diags,
                sp,
                tp,
                ConversionError::IncompatibleTypes {
                    source_type: src.shape_name(),
                    target_type: dst_ty.to_string(),
                    reason: format!("expected wrapper {}", src_ty),
                },
            );
            return Some(diags);
        };

        match mode {
            WrapperMode::Collection => {
                let (value, d) = self.collect_sequence(wrapper, shape, dst_ty, sp, tp, depth);
                *dst = value;
                diags.append(d);
            }
            WrapperMode::Block(block_def) => {
                if opts.omitempty && shape.is_rule2() && shape.is_all_zero(wrapper) {
                    tracing::debug!(
                        source_path = %sp,
                        target_path = %tp,
                        "empty wrapper collapsed to null"
                    );
                    *dst = DomainValue::Null;
                    return Some(diags);
                }
                let block_tp = match dst_ty {
                    DomainType::Object(_) => tp.clone(),
                    _ => tp.at_index(0),
                };
                let (block, d) =
                    self.internalize_block(wrapper, &block_def, sp, &block_tp, shape, depth + 1);
                diags.append(d);
                if let Some(block) = block {
                    *dst = match dst_ty {
                        DomainType::Set(_) => DomainValue::set([DomainValue::object(block)]),
                        DomainType::List(_) => DomainValue::list([DomainValue::object(block)]),
                        _ => DomainValue::object(block),
                    };
                }
            }
        }
        Some(diags)
    }

    fn internalize_block(
        &self,
        wrapper: &WireObject,
        block_def: &Arc<DomainStruct>,
        sp: &Path,
        tp: &Path,
        shape: &WrapperShape,
        depth: usize,
    ) -> (Option<DomainObject>, Diagnostics) {
        let mut diags = Diagnostics::new();
        if self.too_deep(depth, sp, tp, &mut diags) {
            return (None, diags);
        }
        let mut block = DomainObject::new(block_def.clone());

        if let Some(hook) = &block_def.hooks.internalizer {
            let ctx = HookContext {
                source_path: sp,
                target_path: tp,
            };
            let d = hook.internalize(ctx, &WireValue::Struct(wrapper.clone()), &mut block);
            let ok = !d.has_error();
            diags.append(d);
            return (ok.then_some(block), diags);
        }

        let block_schema = self.engine.schemas.domain(block_def);
        let seq_index = self.find_field(&shape.sequence, &block_schema);
        if let Some(bi) = seq_index {
            let field = &block_schema.fields[bi];
            let (value, d) = self.collect_sequence(
                wrapper,
                shape,
                &block_def.fields[bi].ty,
                sp,
                &tp.at_name(&field.declared_name),
                depth,
            );
            block.values_mut()[bi] = value;
            diags.append(d);
        }
        if self.should_stop(&diags) {
            return (Some(block), diags);
        }

        let def = wrapper.def().clone();
        let wire_schema = self.engine.schemas.wire(&def);
        for sibling in &shape.siblings {
            let (Some(wi), Some(bi)) = (
                def.field_index(sibling),
                self.find_field(sibling, &block_schema),
            ) else {
                continue;
            };
            let bd = &block_schema.fields[bi];
            if Some(bi) == seq_index || bd.ignored || bd.read_only || bd.no_internalize {
                continue;
            }
            diags.append(self.internalize_value(
                &wrapper.values()[wi],
                &def.fields[wi].ty,
                &sp.at_name(sibling),
                &mut block.values_mut()[bi],
                &block_def.fields[bi].ty,
                &tp.at_name(&bd.declared_name),
                &FieldOpts::between(bd, &wire_schema.fields[wi]),
                depth,
            ));
            if self.should_stop(&diags) {
                break;
            }
        }
        (Some(block), diags)
    }

    /// Read the sequence field into a collection of type `ty`.
    ///
    /// A nil sequence gives a known empty collection.
    fn collect_sequence(
        &self,
        wrapper: &WireObject,
        shape: &WrapperShape,
        ty: &DomainType,
        sp: &Path,
        tp: &Path,
        depth: usize,
    ) -> (DomainValue, Diagnostics) {
        let def = wrapper.def();
        let Some(si) = def.field_index(&shape.sequence) else {
            return (DomainValue::Null, Diagnostics::new());
        };
        let seq = &wrapper.values()[si];
        if seq.deref().is_none() {
            let empty = match ty {
                DomainType::Set(_) => DomainValue::set(Vec::new()),
                _ => DomainValue::list(Vec::new()),
            };
            return (empty, Diagnostics::new());
        }
        let mut out = DomainValue::Null;
        let diags = self.internalize_value(
            seq,
            &def.fields[si].ty,
            &sp.at_name(&shape.sequence),
            &mut out,
            ty,
            tp,
            &FieldOpts::default(),
            depth,
        );
        (out, diags)
    }

    /// Wire fields whose pointee is a Rule 2 wrapper, with their shapes.
    fn rule2_fields(&self, def: &Arc<WireStruct>) -> Vec<(usize, Arc<WireStruct>, WrapperShape)> {
        def.fields
            .iter()
            .enumerate()
            .filter_map(|(i, f)| {
                let inner = f.ty.struct_def()?;
                let shape = self.engine.schemas.wrapper_shape(inner)?;
                shape.is_rule2().then(|| (i, inner.clone(), shape))
            })
            .collect()
    }

    /// Externalize pre-pass: feed Rule 2 wrapper fields from a plain
    /// collection plus same-named sibling fields of the enclosing struct.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn collapse(
        &self,
        src: &DomainObject,
        src_schema: &StructSchema,
        sp: &Path,
        dst: &mut WireObject,
        dst_schema: &StructSchema,
        tp: &Path,
        depth: usize,
        processed: &mut BTreeSet<String>,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let dst_def = dst.def().clone();
        let src_def = src.def().clone();

        for (ti, wrapper_def, shape) in self.rule2_fields(&dst_def) {
            let wd = &dst_schema.fields[ti];
            if wd.ignored || wd.read_only {
                continue;
            }
            let Some(di) = self.find_field(wd.match_name(), src_schema) else {
                continue;
            };
            let fd = &src_schema.fields[di];
            if self.skip_reason(fd, depth).is_some()
                || processed.contains(&fd.declared_name)
                || fd.wrapper_field_name.is_some()
                || !src_def.fields[di].ty.is_plain_collection()
            {
                continue;
            }

            let siblings: Vec<(usize, usize)> = shape
                .siblings
                .iter()
                .filter_map(|s| {
                    let wi = wrapper_def.field_index(s)?;
                    let si = self.find_field(s, src_schema)?;
                    let sd = &src_schema.fields[si];
                    let usable = si != di
                        && self.skip_reason(sd, depth).is_none()
                        && !processed.contains(&sd.declared_name);
                    usable.then_some((wi, si))
                })
                .collect();

            processed.insert(fd.declared_name.clone());
            for &(_, si) in &siblings {
                processed.insert(src_schema.fields[si].declared_name.clone());
            }

            let field_tp = tp.at_name(&wd.declared_name);
            let slot_ty = &dst_def.fields[ti].ty;
            let all_null = std::iter::once(di)
                .chain(siblings.iter().map(|&(_, si)| si))
                .all(|i| src.values()[i].is_null());
            if all_null && slot_ty.is_pointer() {
                self.note(
                    &mut diags,
                    &sp.at_name(&fd.declared_name),
                    &field_tp,
                    "collapse left wrapper nil",
                );
                dst.values_mut()[ti] = WireValue::Nil;
                continue;
            }
            self.note(
                &mut diags,
                &sp.at_name(&fd.declared_name),
                &field_tp,
                "collapsed into wrapper",
            );

            let slot = &mut dst.values_mut()[ti];
            let mut wrapper = take_struct(slot, &wrapper_def);
            diags.append(self.fill_sequence(
                &src.values()[di],
                &src_def.fields[di].ty,
                &sp.at_name(&fd.declared_name),
                &mut wrapper,
                &field_tp,
                &shape,
                depth,
            ));
            let wire_schema = self.engine.schemas.wire(&wrapper_def);
            for &(wi, si) in &siblings {
                if self.should_stop(&diags) {
                    break;
                }
                let sd = &src_schema.fields[si];
                diags.append(self.externalize_value(
                    &src.values()[si],
                    &src_def.fields[si].ty,
                    &sp.at_name(&sd.declared_name),
                    &mut wrapper.values_mut()[wi],
                    &wrapper_def.fields[wi].ty,
                    &field_tp.at_name(&wrapper_def.fields[wi].name),
                    &FieldOpts::between(sd, &wire_schema.fields[wi]),
                    depth,
                ));
            }
            place(&mut dst.values_mut()[ti], WireValue::Struct(wrapper), slot_ty.is_pointer());
            if self.should_stop(&diags) {
                break;
            }
        }
        diags
    }

    /// Internalize pre-pass: split Rule 2 wrapper fields into a plain
    /// collection plus same-named sibling fields of the enclosing struct.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn split(
        &self,
        src: &WireObject,
        src_schema: &StructSchema,
        sp: &Path,
        dst: &mut DomainObject,
        dst_schema: &StructSchema,
        tp: &Path,
        depth: usize,
        processed: &mut BTreeSet<String>,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let src_def = src.def().clone();
        let dst_def = dst.def().clone();

        for (si, wrapper_def, shape) in self.rule2_fields(&src_def) {
            let wd = &src_schema.fields[si];
            if self.skip_reason(wd, depth).is_some() || processed.contains(&wd.declared_name) {
                continue;
            }
            let Some(di) = self.find_field(wd.match_name(), dst_schema) else {
                continue;
            };
            let td = &dst_schema.fields[di];
            if td.ignored
                || td.read_only
                || td.no_internalize
                || td.wrapper_field_name.is_some()
                || !dst_def.fields[di].ty.is_plain_collection()
            {
                continue;
            }
            processed.insert(wd.declared_name.clone());

            let field_sp = sp.at_name(&wd.declared_name);
            let field_tp = tp.at_name(&td.declared_name);
            let Some(wrapper) = src.values()[si].as_struct() else {
                self.note(&mut diags, &field_sp, &field_tp, "nil wrapper split to null");
                dst.values_mut()[di] = DomainValue::Null;
                continue;
            };
            self.note(&mut diags, &field_sp, &field_tp, "split from wrapper");

            let (value, d) = self.collect_sequence(
                wrapper,
                &shape,
                &dst_def.fields[di].ty,
                &field_sp,
                &field_tp,
                depth,
            );
            dst.values_mut()[di] = value;
            diags.append(d);

            let wire_schema = self.engine.schemas.wire(&wrapper_def);
            for sibling in &shape.siblings {
                if self.should_stop(&diags) {
                    break;
                }
                let (Some(wi), Some(ti)) = (
                    wrapper_def.field_index(sibling),
                    self.find_field(sibling, dst_schema),
                ) else {
                    continue;
                };
                let sd = &dst_schema.fields[ti];
                if ti == di || sd.ignored || sd.read_only || sd.no_internalize {
                    continue;
                }
                diags.append(self.internalize_value(
                    &wrapper.values()[wi],
                    &wrapper_def.fields[wi].ty,
                    &field_sp.at_name(sibling),
                    &mut dst.values_mut()[ti],
                    &dst_def.fields[ti].ty,
                    &tp.at_name(&sd.declared_name),
                    &FieldOpts::between(sd, &wire_schema.fields[wi]),
                    depth,
                ));
            }
            if self.should_stop(&diags) {
                break;
            }
        }
        diags
    }
}
