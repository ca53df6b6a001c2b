//! Domain to wire walk.

use std::collections::{BTreeMap, BTreeSet};

use structflex_core::{
    ConversionError, Diagnostics, DomainObject, DomainType, DomainValue, HookContext, Known, Path,
    WireObject, WireType, WireValue,
};

use crate::matrix::{Coercion, DomainKind};
use crate::options::ErrorMode;
use crate::scalar;
use crate::schema::WrapperShape;
use crate::walker::{peel, place, take_struct, FieldOpts, Walker, MAP_BLOCK_KEY};

impl Walker<'_> {
    /// Externalize into a pointer-to-struct target that has been validated.
    pub(crate) fn externalize_root(
        &self,
        source: &DomainObject,
        target: &mut WireValue,
    ) -> Diagnostics {
        let root = Path::root();
        if source.def().hooks.has_externalizer() {
            let target_ty = match target.as_struct() {
                Some(obj) => WireType::pointer(WireType::Struct(obj.def().clone())),
                None => return Diagnostics::new(),
            };
            return self.externalize_hook(source, &root, target, &target_ty, &root);
        }
        match target.as_struct_mut() {
            Some(dst) => self.externalize_struct(source, &root, dst, &root, 0, BTreeSet::new()),
            None => Diagnostics::new(),
        }
    }

    /// Walk the fields of `src` into `dst`.
    ///
    /// Source fields named in `processed` are not converted.
    pub(crate) fn externalize_struct(
        &self,
        src: &DomainObject,
        sp: &Path,
        dst: &mut WireObject,
        tp: &Path,
        depth: usize,
        mut processed: BTreeSet<String>,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if self.too_deep(depth, sp, tp, &mut diags) {
            return diags;
        }

        let src_def = src.def().clone();
        let dst_def = dst.def().clone();
        let src_schema = self.engine.schemas.domain(&src_def);
        let dst_schema = self.engine.schemas.wire(&dst_def);

        diags.append(self.collapse(
            src,
            &src_schema,
            sp,
            dst,
            &dst_schema,
            tp,
            depth,
            &mut processed,
        ));
        if self.should_stop(&diags) {
            return diags;
        }

        for fd in &src_schema.fields {
            let field_sp = sp.at_name(&fd.declared_name);
            if let Some(reason) = self.skip_reason(fd, depth) {
                self.note(&mut diags, &field_sp, tp, reason);
                continue;
            }
            if processed.contains(&fd.declared_name) {
                self.note(&mut diags, &field_sp, tp, "skipped field consumed by wrapper");
                continue;
            }

            let Some(ti) = self.find_field(fd.match_name(), &dst_schema) else {
                if self.options.error_mode == ErrorMode::Strict {
                    self.fail_fatal(
                        &mut diags,
                        &field_sp,
                        tp,
                        ConversionError::UnmatchedField {
                            field: fd.declared_name.clone(),
                            target_type: dst_schema.type_name.clone(),
                        },
                    );
                    break;
                }
                tracing::debug!(
                    source_path = %field_sp,
                    target_type = %dst_schema.type_name,
                    "no matching target field"
                );
                self.note(&mut diags, &field_sp, tp, "no matching target field");
                continue;
            };

            let td = &dst_schema.fields[ti];
            let field_tp = tp.at_name(&td.declared_name);
            if td.ignored || td.read_only {
                self.note(&mut diags, &field_sp, &field_tp, "skipped read-only target");
                continue;
            }

            self.note(&mut diags, &field_sp, &field_tp, "matched");
            let opts = FieldOpts::between(fd, td);
            let field_diags = self.externalize_value(
                &src.values()[fd.index],
                &src_def.fields[fd.index].ty,
                &field_sp,
                &mut dst.values_mut()[ti],
                &dst_def.fields[ti].ty,
                &field_tp,
                &opts,
                depth,
            );
            diags.append(field_diags);
            if self.should_stop(&diags) {
                break;
            }
        }
        diags
    }

    /// Convert one domain value into the wire slot `dst` of type `dst_ty`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn externalize_value(
        &self,
        src: &DomainValue,
        src_ty: &DomainType,
        sp: &Path,
        dst: &mut WireValue,
        dst_ty: &WireType,
        tp: &Path,
        opts: &FieldOpts,
        depth: usize,
    ) -> Diagnostics {
        tracing::trace!(
            source_path = %sp,
            target_path = %tp,
            source_type = %src_ty,
            target_type = %dst_ty,
            "converting"
        );
        let mut diags = Diagnostics::new();

        if let Some(obj) = src.as_object() {
            if obj.def().hooks.has_externalizer() {
                return self.externalize_hook(obj, sp, dst, dst_ty, tp);
            }
        }

        if let Some(sequence) = &opts.wrapper {
            return self.externalize_declared_wrapper(
                src, src_ty, sp, dst, dst_ty, tp, opts, sequence, depth,
            );
        }

        let (inner_ty, is_ptr) = peel(dst_ty);
        let Some(wire_kind) = self.wire_kind(inner_ty) else {
            self.fail(
                &mut diags,
                sp,
                tp,
                ConversionError::IncompatibleTypes {
                    source_type: src_ty.to_string(),
                    target_type: dst_ty.to_string(),
                    reason: "pointer to pointer".to_string(),
                },
            );
            return diags;
        };
        let domain_kind = DomainKind::of(src_ty);
        let mut coercion = self.engine.matrix.externalize_rule(domain_kind, wire_kind);

        if coercion == Some(Coercion::CountedWrapper) {
            if let Some(shape) = inner_ty
                .struct_def()
                .and_then(|def| self.engine.schemas.wrapper_shape(def))
            {
                if let Some(d) =
                    self.externalize_wrapper(src, src_ty, sp, dst, dst_ty, tp, opts, &shape, depth)
                {
                    return d;
                }
            }
            coercion = Some(Coercion::Nested);
        }

        let Some(known) = src.known() else {
            if opts.legacy {
                tracing::debug!(
                    source_path = %sp,
                    target_path = %tp,
                    "legacy zero value for absent source"
                );
                *dst = dst_ty.zero_value();
            }
            return diags;
        };

        let Some(coercion) = coercion else {
            self.fail(
                &mut diags,
                sp,
                tp,
                ConversionError::IncompatibleTypes {
                    source_type: src_ty.to_string(),
                    target_type: dst_ty.to_string(),
                    reason: "no conversion between these kinds".to_string(),
                },
            );
            return diags;
        };

        match coercion {
            Coercion::Assign | Coercion::Widen | Coercion::Narrow | Coercion::Text => {
                match scalar::externalize(known, inner_ty) {
                    Ok(converted) => {
                        if let Some(message) = converted.warning {
                            self.warn(&mut diags, sp, tp, message);
                        }
                        if opts.legacy && is_ptr && converted.value.is_zero_like() {
                            tracing::debug!(
                                source_path = %sp,
                                target_path = %tp,
                                "legacy zero value left nil"
                            );
                            *dst = WireValue::Nil;
                        } else {
                            place(dst, converted.value, is_ptr);
                        }
                    }
                    Err(error) => self.fail(&mut diags, sp, tp, error),
                }
            }
            Coercion::Elements => {
                diags.append(self.externalize_elements(
                    known, src_ty, sp, dst, inner_ty, is_ptr, tp, depth,
                ))
            }
            Coercion::Entries => {
                diags.append(self.externalize_entries(
                    known, src_ty, sp, dst, inner_ty, is_ptr, tp, depth,
                ))
            }
            Coercion::Nested => {
                diags.append(self.externalize_nested(known, sp, dst, inner_ty, is_ptr, tp, depth))
            }
            Coercion::SingleBlock => match known {
                Known::List(items) | Known::Set(items) => {
                    if let Some(first) = items.first() {
                        let block_ty = src_ty.element().cloned().unwrap_or_else(|| src_ty.clone());
                        diags.append(self.externalize_value(
                            first,
                            &block_ty,
                            &sp.at_index(0),
                            dst,
                            dst_ty,
                            tp,
                            &FieldOpts::default(),
                            depth,
                        ));
                    }
                }
                other => self.fail(&mut diags, sp, tp, mismatch(other, dst_ty)),
            },
            Coercion::KeyedBlocks => {
                diags.append(self.externalize_keyed_blocks(
                    known, sp, dst, inner_ty, is_ptr, tp, depth,
                ))
            }
            Coercion::CountedWrapper => {}
        }
        diags
    }

    /// Run the externalization hook of `obj`'s type and store its result.
    pub(crate) fn externalize_hook(
        &self,
        obj: &DomainObject,
        sp: &Path,
        dst: &mut WireValue,
        dst_ty: &WireType,
        tp: &Path,
    ) -> Diagnostics {
        let hooks = &obj.def().hooks;
        let ctx = HookContext {
            source_path: sp,
            target_path: tp,
        };
        tracing::trace!(
            source_path = %sp,
            target_path = %tp,
            source_type = %obj.type_name(),
            "externalize hook"
        );

        let (result, mut diags) = if let Some(hook) = &hooks.typed_externalizer {
            hook.externalize_to(ctx, obj, dst_ty)
        } else if let Some(hook) = &hooks.externalizer {
            hook.externalize(ctx, obj)
        } else {
            return Diagnostics::new();
        };
        if diags.has_error() {
            return diags;
        }

        let value = match result {
            Some(value) if !value.is_nil() => value,
            _ => {
                self.fail_fatal(
                    &mut diags,
                    sp,
                    tp,
                    ConversionError::HookReturnedNil {
                        type_name: obj.type_name().to_string(),
                    },
                );
                return diags;
            }
        };

        let result_type = value.shape_name();
        match assign_to(value, dst_ty) {
            Some(assigned) => *dst = assigned,
            None => self.fail_fatal(
                &mut diags,
                sp,
                tp,
                ConversionError::HookResultNotAssignable {
                    result_type,
                    target_type: dst_ty.to_string(),
                },
            ),
        }
        diags
    }

    #[allow(clippy::too_many_arguments)]
    fn externalize_declared_wrapper(
        &self,
        src: &DomainValue,
        src_ty: &DomainType,
        sp: &Path,
        dst: &mut WireValue,
        dst_ty: &WireType,
        tp: &Path,
        opts: &FieldOpts,
        sequence: &str,
        depth: usize,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let Some(def) = dst_ty.struct_def() else {
            self.fail_fatal(
                &mut diags,
                sp,
                tp,
                ConversionError::IncompatibleTypes {
                    source_type: src_ty.to_string(),
                    target_type: dst_ty.to_string(),
                    reason: "declared wrapper target is not a struct".to_string(),
                },
            );
            return diags;
        };
        let shape = match WrapperShape::declared(def, sequence) {
            Ok(shape) => shape,
            Err(error) => {
                self.fail_fatal(&mut diags, sp, tp, error);
                return diags;
            }
        };
        match self.externalize_wrapper(src, src_ty, sp, dst, dst_ty, tp, opts, &shape, depth) {
            Some(d) => d,
            None => {
                let opts = opts.without_wrapper();
                self.externalize_value(src, src_ty, sp, dst, dst_ty, tp, &opts, depth)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn externalize_elements(
        &self,
        known: &Known,
        src_ty: &DomainType,
        sp: &Path,
        dst: &mut WireValue,
        slice_ty: &WireType,
        is_ptr: bool,
        tp: &Path,
        depth: usize,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let (items, elem_dty, elem_wty) = match (known, src_ty.element(), slice_ty) {
            (Known::List(items) | Known::Set(items), Some(d), WireType::Slice(w)) => {
                (items, d, &**w)
            }
            (other, _, _) => {
                self.fail(&mut diags, sp, tp, mismatch(other, slice_ty));
                return diags;
            }
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut slot = elem_wty.zero_value();
            diags.append(self.externalize_value(
                item,
                elem_dty,
                &sp.at_index(i),
                &mut slot,
                elem_wty,
                &tp.at_index(i),
                &FieldOpts::default(),
                depth,
            ));
            out.push(slot);
            if self.should_stop(&diags) {
                break;
            }
        }
        place(dst, WireValue::Slice(out), is_ptr);
        diags
    }

    #[allow(clippy::too_many_arguments)]
    fn externalize_entries(
        &self,
        known: &Known,
        src_ty: &DomainType,
        sp: &Path,
        dst: &mut WireValue,
        map_ty: &WireType,
        is_ptr: bool,
        tp: &Path,
        depth: usize,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let (entries, elem_dty, elem_wty) = match (known, src_ty.element(), map_ty) {
            (Known::Map(entries), Some(d), WireType::Map(w)) => (entries, d, &**w),
            (other, _, _) => {
                self.fail(&mut diags, sp, tp, mismatch(other, map_ty));
                return diags;
            }
        };

        let mut out = BTreeMap::new();
        for (key, value) in entries {
            let mut slot = elem_wty.zero_value();
            diags.append(self.externalize_value(
                value,
                elem_dty,
                &sp.at_key(key),
                &mut slot,
                elem_wty,
                &tp.at_key(key),
                &FieldOpts::default(),
                depth,
            ));
            out.insert(key.clone(), slot);
            if self.should_stop(&diags) {
                break;
            }
        }
        place(dst, WireValue::Map(out), is_ptr);
        diags
    }

    #[allow(clippy::too_many_arguments)]
    fn externalize_nested(
        &self,
        known: &Known,
        sp: &Path,
        dst: &mut WireValue,
        struct_ty: &WireType,
        is_ptr: bool,
        tp: &Path,
        depth: usize,
    ) -> Diagnostics {
        let (obj, def) = match (known, struct_ty.struct_def()) {
            (Known::Object(obj), Some(def)) => (obj, def),
            (other, _) => {
                let mut diags = Diagnostics::new();
                self.fail(&mut diags, sp, tp, mismatch(other, struct_ty));
                return diags;
            }
        };
        let mut target = take_struct(dst, def);
        let diags = self.externalize_struct(obj, sp, &mut target, tp, depth + 1, BTreeSet::new());
        place(dst, WireValue::Struct(target), is_ptr);
        diags
    }

    #[allow(clippy::too_many_arguments)]
    fn externalize_keyed_blocks(
        &self,
        known: &Known,
        sp: &Path,
        dst: &mut WireValue,
        map_ty: &WireType,
        is_ptr: bool,
        tp: &Path,
        depth: usize,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let (items, elem_wty, def) = match (known, map_ty) {
            (Known::List(items) | Known::Set(items), WireType::Map(elem)) => {
                match elem.struct_def() {
                    Some(def) => (items, &**elem, def),
                    None => {
                        self.fail(&mut diags, sp, tp, mismatch(known, map_ty));
                        return diags;
                    }
                }
            }
            (other, _) => {
                self.fail(&mut diags, sp, tp, mismatch(other, map_ty));
                return diags;
            }
        };

        let mut out = BTreeMap::new();
        for (i, item) in items.iter().enumerate() {
            let item_sp = sp.at_index(i);
            let Some(block) = item.as_object() else {
                continue;
            };
            let key = match block.get(MAP_BLOCK_KEY) {
                Some(DomainValue::Known(Known::String(key))) => key.clone(),
                _ => {
                    self.fail_fatal(
                        &mut diags,
                        &item_sp,
                        tp,
                        ConversionError::MissingMapBlockKey {
                            type_name: block.type_name().to_string(),
                        },
                    );
                    return diags;
                }
            };
            let item_tp = tp.at_key(&key);

            let mut slot = WireValue::Nil;
            if block.def().hooks.has_externalizer() {
                diags.append(self.externalize_hook(block, &item_sp, &mut slot, elem_wty, &item_tp));
            } else {
                let mut target = WireObject::zero(def.clone());
                let skip = BTreeSet::from([MAP_BLOCK_KEY.to_string()]);
                diags.append(self.externalize_struct(
                    block,
                    &item_sp,
                    &mut target,
                    &item_tp,
                    depth + 1,
                    skip,
                ));
                place(&mut slot, WireValue::Struct(target), elem_wty.is_pointer());
            }
            out.insert(key, slot);
            if self.should_stop(&diags) {
                break;
            }
        }
        place(dst, WireValue::Map(out), is_ptr);
        diags
    }
}

fn mismatch(known: &Known, target: &WireType) -> ConversionError {
    ConversionError::IncompatibleTypes {
        source_type: known.kind_name().to_string(),
        target_type: target.to_string(),
        reason: "value does not match its declared type".to_string(),
    }
}

/// Coerce a hook result into `ty`, if it is assignable.
///
/// Accepts the same struct type, a pointer to it where a value is expected
/// and the other way round, and any struct implementing a target interface.
fn assign_to(value: WireValue, ty: &WireType) -> Option<WireValue> {
    match ty {
        WireType::Pointer(inner) => match value {
            WireValue::Pointer(v) if matches!(*v, WireValue::Pointer(_)) => None,
            WireValue::Pointer(v) => assign_to(*v, inner).map(WireValue::pointer),
            v => assign_to(v, inner).map(WireValue::pointer),
        },
        WireType::Struct(def) => match value {
            WireValue::Struct(obj) if obj.type_name() == def.name => {
                Some(WireValue::Struct(obj))
            }
            WireValue::Pointer(inner) => match *inner {
                WireValue::Struct(obj) if obj.type_name() == def.name => {
                    Some(WireValue::Struct(obj))
                }
                _ => None,
            },
            _ => None,
        },
        WireType::Interface(iface) => {
            let implements = value
                .as_struct()
                .is_some_and(|obj| iface.is_implemented_by(obj.type_name()));
            implements.then_some(value)
        }
        _ => {
            let fits = matches!(
                (&value, ty),
                (WireValue::Bool(_), WireType::Bool)
                    | (WireValue::Int32(_), WireType::Int32)
                    | (WireValue::Int64(_), WireType::Int64)
                    | (WireValue::Float32(_), WireType::Float32)
                    | (WireValue::Float64(_), WireType::Float64)
                    | (WireValue::String(_), WireType::String)
                    | (WireValue::Bytes(_), WireType::Bytes)
                    | (WireValue::Slice(_), WireType::Slice(_))
                    | (WireValue::Map(_), WireType::Map(_))
            );
            fits.then_some(value)
        }
    }
}
