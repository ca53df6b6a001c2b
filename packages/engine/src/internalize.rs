//! Wire to domain walk.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use structflex_core::{
    ConversionError, Diagnostics, DomainObject, DomainStruct, DomainType, DomainValue, HookContext,
    Known, Path, WireObject, WireType, WireValue,
};

use crate::matrix::{Coercion, DomainKind};
use crate::options::ErrorMode;
use crate::scalar;
use crate::schema::WrapperShape;
use crate::walker::{peel, FieldOpts, Walker, MAP_BLOCK_KEY};

impl Walker<'_> {
    /// Internalize a validated wire struct into `target`.
    ///
    /// A type-level internalizer receives `target` itself. When it reports an
    /// error, `target` is left as it was.
    pub(crate) fn internalize_root(
        &self,
        source: &WireObject,
        target: &mut DomainObject,
    ) -> Diagnostics {
        let root = Path::root();
        if let Some(hook) = target.def().hooks.internalizer.clone() {
            let ctx = HookContext {
                source_path: &root,
                target_path: &root,
            };
            let mut scratch = target.clone();
            let diags = hook.internalize(ctx, &WireValue::Struct(source.clone()), &mut scratch);
            if !diags.has_error() {
                *target = scratch;
            }
            return diags;
        }
        self.internalize_struct(source, &root, target, &root, 0)
    }

    pub(crate) fn internalize_struct(
        &self,
        src: &WireObject,
        sp: &Path,
        dst: &mut DomainObject,
        tp: &Path,
        depth: usize,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if self.too_deep(depth, sp, tp, &mut diags) {
            return diags;
        }

        let src_def = src.def().clone();
        let dst_def = dst.def().clone();
        let src_schema = self.engine.schemas.wire(&src_def);
        let dst_schema = self.engine.schemas.domain(&dst_def);

        let mut processed = BTreeSet::new();
        diags.append(self.split(src, &src_schema, sp, dst, &dst_schema, tp, depth, &mut processed));
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
            if td.ignored || td.read_only || td.no_internalize {
                self.note(&mut diags, &field_sp, &field_tp, "skipped read-only target");
                continue;
            }

            self.note(&mut diags, &field_sp, &field_tp, "matched");
            let opts = FieldOpts::between(td, fd);
            diags.append(self.internalize_value(
                &src.values()[fd.index],
                &src_def.fields[fd.index].ty,
                &field_sp,
                &mut dst.values_mut()[ti],
                &dst_def.fields[ti].ty,
                &field_tp,
                &opts,
                depth,
            ));
            if self.should_stop(&diags) {
                break;
            }
        }
        diags
    }

    /// Convert one wire value into the domain slot `dst` of type `dst_ty`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn internalize_value(
        &self,
        src: &WireValue,
        src_ty: &WireType,
        sp: &Path,
        dst: &mut DomainValue,
        dst_ty: &DomainType,
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

        if let Some(sequence) = &opts.wrapper {
            let Some(def) = src_ty.struct_def() else {
                self.fail_fatal(
                    &mut diags,
                    sp,
                    tp,
                    incompatible(src_ty, dst_ty, "declared wrapper source is not a struct"),
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
            return match self
                .internalize_wrapper(src, src_ty, sp, dst, dst_ty, tp, opts, &shape, depth)
            {
                Some(d) => d,
                None => {
                    let opts = opts.without_wrapper();
                    self.internalize_value(src, src_ty, sp, dst, dst_ty, tp, &opts, depth)
                }
            };
        }

        let (inner_ty, _) = peel(src_ty);
        let Some(wire_kind) = self.wire_kind(inner_ty) else {
            self.fail(&mut diags, sp, tp, incompatible(src_ty, dst_ty, "pointer to pointer"));
            return diags;
        };
        let mut coercion = self.engine.matrix.internalize_rule(wire_kind, DomainKind::of(dst_ty));

        if coercion == Some(Coercion::CountedWrapper) {
            if let Some(shape) = inner_ty
                .struct_def()
                .and_then(|def| self.engine.schemas.wrapper_shape(def))
            {
                if let Some(d) =
                    self.internalize_wrapper(src, src_ty, sp, dst, dst_ty, tp, opts, &shape, depth)
                {
                    return d;
                }
            }
            coercion = Some(Coercion::Nested);
        }

        let Some(value) = src.deref() else {
            *dst = match scalar::zero_known(dst_ty) {
                Some(zero) if opts.legacy => {
                    tracing::debug!(
                        source_path = %sp,
                        target_path = %tp,
                        "legacy zero value for nil source"
                    );
                    DomainValue::Known(zero)
                }
                _ => DomainValue::Null,
            };
            return diags;
        };

        let Some(coercion) = coercion else {
            self.fail(
                &mut diags,
                sp,
                tp,
                incompatible(src_ty, dst_ty, "no conversion between these kinds"),
            );
            return diags;
        };

        match coercion {
            Coercion::Assign | Coercion::Widen | Coercion::Narrow | Coercion::Text => {
                match scalar::internalize(value, dst_ty) {
                    Ok(converted) => {
                        if let Some(message) = converted.warning {
                            self.warn(&mut diags, sp, tp, message);
                        }
                        *dst = match converted.value {
                            Known::String(s) if s.is_empty() && opts.omitempty => DomainValue::Null,
                            known => DomainValue::Known(known),
                        };
                    }
                    Err(error) => self.fail(&mut diags, sp, tp, error),
                }
            }
            Coercion::Elements => {
                let (WireValue::Slice(items), WireType::Slice(elem_wty), Some(elem_dty)) =
                    (value, inner_ty, dst_ty.element())
                else {
                    self.fail(
                        &mut diags,
                        sp,
                        tp,
                        incompatible(src_ty, dst_ty, "value does not match its declared type"),
                    );
                    return diags;
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    if item.is_nil() {
                        continue;
                    }
                    let mut slot = DomainValue::Null;
                    diags.append(self.internalize_value(
                        item,
                        elem_wty,
                        &sp.at_index(i),
                        &mut slot,
                        elem_dty,
                        &tp.at_index(out.len()),
                        &FieldOpts::default(),
                        depth,
                    ));
                    out.push(slot);
                    if self.should_stop(&diags) {
                        break;
                    }
                }
                *dst = match dst_ty {
                    DomainType::Set(_) => DomainValue::set(out),
                    _ => DomainValue::list(out),
                };
            }
            Coercion::Entries => {
                let (WireValue::Map(entries), WireType::Map(elem_wty), Some(elem_dty)) =
                    (value, inner_ty, dst_ty.element())
                else {
                    self.fail(
                        &mut diags,
                        sp,
                        tp,
                        incompatible(src_ty, dst_ty, "value does not match its declared type"),
                    );
                    return diags;
                };
                let mut out = BTreeMap::new();
                for (key, item) in entries {
                    let mut slot = DomainValue::Null;
                    diags.append(self.internalize_value(
                        item,
                        elem_wty,
                        &sp.at_key(key),
                        &mut slot,
                        elem_dty,
                        &tp.at_key(key),
                        &FieldOpts::default(),
                        depth,
                    ));
                    out.insert(key.clone(), slot);
                    if self.should_stop(&diags) {
                        break;
                    }
                }
                *dst = DomainValue::map(out);
            }
            Coercion::Nested | Coercion::SingleBlock => {
                let (Some(obj), Some(def)) = (value.as_struct(), dst_ty.object_def()) else {
                    self.fail(
                        &mut diags,
                        sp,
                        tp,
                        incompatible(src_ty, dst_ty, "value does not match its declared type"),
                    );
                    return diags;
                };
                let block_tp = match dst_ty {
                    DomainType::Object(_) => tp.clone(),
                    _ => tp.at_index(0),
                };
                let (block, d) = self.new_object(def, obj, sp, &block_tp, depth + 1);
                diags.append(d);
                if let Some(block) = block {
                    *dst = match dst_ty {
                        DomainType::Set(_) => DomainValue::set([DomainValue::object(block)]),
                        DomainType::List(_) => DomainValue::list([DomainValue::object(block)]),
                        _ => DomainValue::object(block),
                    };
                }
            }
            Coercion::KeyedBlocks => {
                let (WireValue::Map(entries), Some(def)) = (value, dst_ty.object_def()) else {
                    self.fail(
                        &mut diags,
                        sp,
                        tp,
                        incompatible(src_ty, dst_ty, "value does not match its declared type"),
                    );
                    return diags;
                };
                if def.field_index(MAP_BLOCK_KEY).is_none() {
                    self.fail_fatal(
                        &mut diags,
                        sp,
                        tp,
                        ConversionError::MissingMapBlockKey {
                            type_name: def.name.clone(),
                        },
                    );
                    return diags;
                }
                let mut out = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let Some(obj) = item.as_struct() else {
                        continue;
                    };
                    let item_tp = tp.at_index(out.len());
                    let (block, d) =
                        self.new_object(def, obj, &sp.at_key(key), &item_tp, depth + 1);
                    diags.append(d);
                    if let Some(mut block) = block {
                        if let Some(slot) = block.get_mut(MAP_BLOCK_KEY) {
                            *slot = DomainValue::string(key.clone());
                        }
                        out.push(DomainValue::object(block));
                    }
                    if self.should_stop(&diags) {
                        break;
                    }
                }
                *dst = match dst_ty {
                    DomainType::Set(_) => DomainValue::set(out),
                    _ => DomainValue::list(out),
                };
            }
            Coercion::CountedWrapper => {}
        }
        diags
    }

    /// Build a domain object of type `def` from a wire struct.
    ///
    /// `None` when the type's internalizer reported an error.
    fn new_object(
        &self,
        def: &Arc<DomainStruct>,
        src: &WireObject,
        sp: &Path,
        tp: &Path,
        depth: usize,
    ) -> (Option<DomainObject>, Diagnostics) {
        let mut obj = DomainObject::new(def.clone());
        if let Some(hook) = &def.hooks.internalizer {
            let ctx = HookContext {
                source_path: sp,
                target_path: tp,
            };
            let diags = hook.internalize(ctx, &WireValue::Struct(src.clone()), &mut obj);
            let ok = !diags.has_error();
            return (ok.then_some(obj), diags);
        }
        let diags = self.internalize_struct(src, sp, &mut obj, tp, depth);
        (Some(obj), diags)
    }
}

fn incompatible(source: &WireType, target: &DomainType, reason: &str) -> ConversionError {
    ConversionError::IncompatibleTypes {
        source_type: source.to_string(),
        target_type: target.to_string(),
        reason: reason.to_string(),
    }
}
